use std::process::ExitCode;

use arch_bot_commons::*;

fn main() -> ExitCode {
    if std::env::var_os("RUST_LOG").is_none() {
        std::env::set_var("RUST_LOG", "WARN,trading_status_bot=info,arch_bot_commons=info");
    }
    match start_everything(trading_status_bot::entry()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
