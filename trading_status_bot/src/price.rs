use std::{fmt, ops::Range, str::FromStr};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Asset {
    Bitcoin,
    Ethereum,
    Solana,
}

impl Asset {
    pub const ALL: &'static [Asset] = &[Asset::Bitcoin, Asset::Ethereum, Asset::Solana];

    pub fn ticker(self) -> &'static str {
        match self {
            Asset::Bitcoin => "BTC",
            Asset::Ethereum => "ETH",
            Asset::Solana => "SOL",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Asset::Bitcoin => "Bitcoin",
            Asset::Ethereum => "Ethereum",
            Asset::Solana => "Solana",
        }
    }

    /// Range the made up price of this asset falls into, in USD.
    fn price_range(self) -> Range<f64> {
        match self {
            Asset::Bitcoin => 40_000.0..50_000.0,
            Asset::Ethereum => 2_000.0..3_000.0,
            Asset::Solana => 80.0..160.0,
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("unknown asset {0:?}")]
pub struct UnknownAsset(pub String);

impl FromStr for Asset {
    type Err = UnknownAsset;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_lowercase().as_str() {
            "btc" | "bitcoin" => Asset::Bitcoin,
            "eth" | "ethereum" => Asset::Ethereum,
            "sol" | "solana" => Asset::Solana,
            _ => return Err(UnknownAsset(s.to_string())),
        })
    }
}

/// Change over 24h stays within this many percent either way.
const MAX_CHANGE_PERCENT: f64 = 3.0;

/// A simulated price quote. There is no real market data behind this.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Quote {
    pub asset: Asset,
    /// USD, rounded to cents.
    pub price: f64,
    /// Percent, rounded to hundredths.
    pub change_percent: f64,
}

impl Quote {
    pub fn generate(asset: Asset) -> Quote {
        Quote::from_unit_samples(asset, rand::random::<f64>(), rand::random::<f64>())
    }

    /// Make a quote out of two samples in `0.0..1.0`,
    /// one for the price and one for the change.
    pub fn from_unit_samples(asset: Asset, price_sample: f64, change_sample: f64) -> Quote {
        let range = asset.price_range();
        let price = range.start + price_sample.clamp(0.0, 1.0) * (range.end - range.start);
        let change = (change_sample.clamp(0.0, 1.0) * 2.0 - 1.0) * MAX_CHANGE_PERCENT;

        Quote {
            asset,
            price: round_to_hundredths(price),
            change_percent: round_to_hundredths(change),
        }
    }

    pub fn is_bullish(&self) -> bool {
        self.change_percent >= 0.0
    }
}

fn round_to_hundredths(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// Dollar amount with thousand separators, like `$43,210.99`.
pub struct Usd(pub f64);

impl fmt::Display for Usd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cents = (self.0.abs() * 100.0).round() as u64;
        let (whole, cents) = (cents / 100, cents % 100);

        let digits = whole.to_string();
        let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
        for (i, digit) in digits.chars().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 {
                grouped.push(',');
            }
            grouped.push(digit);
        }

        let sign = if self.0 < 0.0 && (whole, cents) != (0, 0) {
            "-"
        } else {
            ""
        };
        write!(f, "{sign}${grouped}.{cents:02}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_assets() {
        assert_eq!("btc".parse::<Asset>(), Ok(Asset::Bitcoin));
        assert_eq!("Bitcoin".parse::<Asset>(), Ok(Asset::Bitcoin));
        assert_eq!(" ETH ".parse::<Asset>(), Ok(Asset::Ethereum));
        assert_eq!("solana".parse::<Asset>(), Ok(Asset::Solana));
        assert_eq!(
            "doge".parse::<Asset>(),
            Err(UnknownAsset("doge".to_string()))
        );
    }

    #[test]
    fn samples_map_onto_ranges() {
        let low = Quote::from_unit_samples(Asset::Bitcoin, 0.0, 0.0);
        assert_eq!(low.price, 40_000.0);
        assert_eq!(low.change_percent, -3.0);
        assert!(!low.is_bullish());

        let mid = Quote::from_unit_samples(Asset::Bitcoin, 0.5, 0.5);
        assert_eq!(mid.price, 45_000.0);
        assert_eq!(mid.change_percent, 0.0);
        assert!(mid.is_bullish());
    }

    #[test]
    fn generated_quotes_stay_in_range() {
        for &asset in Asset::ALL {
            let range = asset.price_range();
            for _ in 0..100 {
                let quote = Quote::generate(asset);
                assert!(quote.price >= range.start && quote.price <= range.end);
                assert!(quote.change_percent.abs() <= MAX_CHANGE_PERCENT);
            }
        }
    }

    #[test]
    fn usd_formatting() {
        assert_eq!(Usd(0.0).to_string(), "$0.00");
        assert_eq!(Usd(999.5).to_string(), "$999.50");
        assert_eq!(Usd(1000.0).to_string(), "$1,000.00");
        assert_eq!(Usd(43210.987).to_string(), "$43,210.99");
        assert_eq!(Usd(1234567.0).to_string(), "$1,234,567.00");
        assert_eq!(Usd(-12.3).to_string(), "-$12.30");
    }
}
