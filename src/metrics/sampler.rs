use std::path::{Path, PathBuf};

use sysinfo::{Disks, Pid, ProcessesToUpdate, System};

/// One resource snapshot, before it is stamped and stored.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MetricReading {
    pub heap_used_bytes: u64,
    pub heap_max_bytes: u64,
    pub system_memory_total_bytes: u64,
    pub system_memory_used_bytes: u64,
    pub disk_total_bytes: u64,
    pub disk_used_bytes: u64,
    /// Fraction of total machine capacity, in `[0, 1]`.
    pub process_cpu_load: f64,
    /// Fraction in `[0, 1]`.
    pub system_cpu_load: f64,
}

pub trait Sampler: Send {
    fn capture(&mut self) -> MetricReading;
}

/// Samples this process and the host through `sysinfo`.
///
/// CPU loads are measured between consecutive captures, so the first
/// reading reports zero.
pub struct SystemSampler {
    system: System,
    pid: Option<Pid>,
    disk_path: PathBuf,
}

impl SystemSampler {
    pub fn new(disk_path: impl Into<PathBuf>) -> Self {
        let pid = match sysinfo::get_current_pid() {
            Ok(pid) => Some(pid),
            Err(e) => {
                tracing::warn!("Process metrics unavailable: {e}");
                None
            }
        };

        Self {
            system: System::new(),
            pid,
            disk_path: disk_path.into(),
        }
    }

    fn process_usage(&mut self) -> (u64, f64) {
        let Some(pid) = self.pid else {
            return (0, 0.0);
        };
        self.system
            .refresh_processes(ProcessesToUpdate::Some(&[pid]), true);

        let cpus = self.system.cpus().len().max(1) as f64;
        self.system
            .process(pid)
            .map(|p| (p.memory(), clamp_fraction(f64::from(p.cpu_usage()) / 100.0 / cpus)))
            .unwrap_or((0, 0.0))
    }
}

impl Sampler for SystemSampler {
    fn capture(&mut self) -> MetricReading {
        self.system.refresh_memory();
        self.system.refresh_cpu_usage();

        let total = self.system.total_memory();
        let used = total.saturating_sub(self.system.available_memory());
        let (disk_total, disk_used) = disk_usage(&self.disk_path);
        let (process_memory, process_cpu) = self.process_usage();

        MetricReading {
            heap_used_bytes: process_memory,
            heap_max_bytes: total,
            system_memory_total_bytes: total,
            system_memory_used_bytes: used,
            disk_total_bytes: disk_total,
            disk_used_bytes: disk_used,
            process_cpu_load: process_cpu,
            system_cpu_load: clamp_fraction(f64::from(self.system.global_cpu_usage()) / 100.0),
        }
    }
}

fn clamp_fraction(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Total and used bytes of the disk holding `path`, else of `/`.
fn disk_usage(path: &Path) -> (u64, u64) {
    let disks = Disks::new_with_refreshed_list();
    let mounts: Vec<(&Path, u64, u64)> = disks
        .list()
        .iter()
        .map(|d| (d.mount_point(), d.total_space(), d.available_space()))
        .collect();

    let target = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
    let disk = longest_mount(&mounts, &target).or_else(|| longest_mount(&mounts, Path::new("/")));

    disk.map(|(_, total, available)| (total, total.saturating_sub(available)))
        .unwrap_or((0, 0))
}

fn longest_mount<'a>(
    mounts: &[(&'a Path, u64, u64)],
    path: &Path,
) -> Option<(&'a Path, u64, u64)> {
    mounts
        .iter()
        .filter(|(mount, _, _)| path.starts_with(mount))
        .max_by_key(|(mount, _, _)| mount.as_os_str().len())
        .copied()
}
