use std::{
    path::Path,
    sync::{Mutex, PoisonError},
};

use serde::Serialize;
use sysinfo::{Disks, System};

/// Load of the machine the bot runs on, in percent.
#[derive(Clone, Copy, Debug, Serialize)]
pub struct HostLoad {
    pub cpu_percent: f32,
    pub memory_percent: f32,
    /// Usage of the disk mounted at `/`, or of the first disk if there's none.
    pub disk_usage: f32,
}

/// Keeps one `System` around, since CPU usage is measured
/// between two refreshes.
pub struct HostMonitor {
    system: Mutex<System>,
}

impl HostMonitor {
    pub fn new() -> HostMonitor {
        let mut system = System::new();
        system.refresh_cpu();
        HostMonitor {
            system: Mutex::new(system),
        }
    }

    /// Blocks for a bit on disk enumeration. Use `spawn_blocking` from async code.
    pub fn sample(&self) -> HostLoad {
        let mut system = self.system.lock().unwrap_or_else(PoisonError::into_inner);
        system.refresh_cpu();
        system.refresh_memory();

        HostLoad {
            cpu_percent: clamp_percent(system.global_cpu_info().cpu_usage()),
            memory_percent: memory_percent(&system),
            disk_usage: disk_usage(),
        }
    }

    pub fn memory_percent(&self) -> f32 {
        let mut system = self.system.lock().unwrap_or_else(PoisonError::into_inner);
        system.refresh_memory();
        memory_percent(&system)
    }
}

impl Default for HostMonitor {
    fn default() -> Self {
        Self::new()
    }
}

fn memory_percent(system: &System) -> f32 {
    percent_of(system.used_memory(), system.total_memory())
}

fn disk_usage() -> f32 {
    let disks = Disks::new_with_refreshed_list();
    let disk = disks
        .iter()
        .find(|x| x.mount_point() == Path::new("/"))
        .or_else(|| disks.iter().next());

    match disk {
        Some(disk) => percent_of(
            disk.total_space().saturating_sub(disk.available_space()),
            disk.total_space(),
        ),
        None => 0.0,
    }
}

/// `used / total` in percent, rounded to tenths. Zero if `total` is.
fn percent_of(used: u64, total: u64) -> f32 {
    if total == 0 {
        return 0.0;
    }
    let percent = used as f64 / total as f64 * 100.0;
    clamp_percent(((percent * 10.0).round() / 10.0) as f32)
}

fn clamp_percent(x: f32) -> f32 {
    if x.is_finite() {
        x.clamp(0.0, 100.0)
    } else {
        0.0
    }
}
