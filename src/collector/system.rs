//! Primary-system collector.
//!
//! Samples CPU, memory, swap, disk, uptime, load and battery through the OS
//! instrumentation layer (`sysinfo`, plus the `battery` crate for power
//! source detail). This is the one collector expected to succeed on every
//! host; everything it reports lands in the snapshot's core fields.

use async_trait::async_trait;
use sysinfo::{CpuRefreshKind, Disks, MemoryRefreshKind, RefreshKind, System};

use crate::collector::{Collector, SampleData, SYSTEM};
use crate::error::Result;
use crate::snapshot::types::{
    BatterySample, CpuSample, DiskIoSample, DiskMount, DiskUsageSample, LoadAverage,
    MemorySample, SwapSample, SystemInfo,
};

struct SystemState {
    system: System,
    disks: Disks,
}

pub struct SystemCollector {
    // tokio Mutex: the guard is held across the CPU measurement sleep.
    state: tokio::sync::Mutex<SystemState>,
    disk_mounts_max: usize,
    include_system_info: bool,
}

impl SystemCollector {
    pub fn new(disk_mounts_max: usize, include_system_info: bool) -> Self {
        let refresh = RefreshKind::nothing()
            .with_cpu(CpuRefreshKind::everything())
            .with_memory(MemoryRefreshKind::everything());
        Self {
            state: tokio::sync::Mutex::new(SystemState {
                system: System::new_with_specifics(refresh),
                disks: Disks::new_with_refreshed_list(),
            }),
            disk_mounts_max,
            include_system_info,
        }
    }

    fn sample_cpu(system: &System) -> CpuSample {
        let cpus = system.cpus();
        CpuSample {
            percent: f64::from(system.global_cpu_usage()),
            count: cpus.len(),
            per_core: cpus.iter().map(|cpu| f64::from(cpu.cpu_usage())).collect(),
        }
    }

    fn sample_memory(system: &System) -> MemorySample {
        let total = system.total_memory();
        let used = system.used_memory();
        MemorySample {
            total_bytes: total,
            used_bytes: used,
            available_bytes: system.available_memory(),
            percent: percent_of(used, total),
        }
    }

    fn sample_swap(system: &System) -> Option<SwapSample> {
        let total = system.total_swap();
        if total == 0 {
            return None;
        }
        let used = system.used_swap();
        Some(SwapSample {
            total_bytes: total,
            used_bytes: used,
            percent: percent_of(used, total),
        })
    }

    fn sample_disks(
        disks: &Disks,
        mounts_max: usize,
    ) -> (Option<DiskUsageSample>, Vec<DiskMount>, DiskIoSample) {
        let mut root = None;
        let mut mounts = Vec::new();
        let mut io = DiskIoSample {
            read_bytes: 0,
            written_bytes: 0,
        };
        for disk in disks.iter() {
            let total = disk.total_space();
            let available = disk.available_space();
            let used = total.saturating_sub(available);
            let usage = DiskUsageSample {
                total_bytes: total,
                used_bytes: used,
                available_bytes: available,
                percent: percent_of(used, total),
            };
            let mount_point = disk.mount_point().to_string_lossy().to_string();
            if mount_point == "/" {
                root = Some(usage.clone());
            }
            if mounts.len() < mounts_max {
                mounts.push(DiskMount {
                    mount_point,
                    device: disk.name().to_string_lossy().to_string(),
                    fs_type: disk.file_system().to_string_lossy().to_string(),
                    total_bytes: usage.total_bytes,
                    used_bytes: usage.used_bytes,
                    available_bytes: usage.available_bytes,
                    percent: usage.percent,
                });
            }
            let disk_usage = disk.usage();
            io.read_bytes += disk_usage.total_read_bytes;
            io.written_bytes += disk_usage.total_written_bytes;
        }
        (root, mounts, io)
    }

    fn sample_system_info(system: &System) -> SystemInfo {
        SystemInfo {
            hostname: System::host_name().unwrap_or_default(),
            os_name: System::name().unwrap_or_default(),
            os_version: System::os_version().unwrap_or_default(),
            kernel_version: System::kernel_version().unwrap_or_default(),
            arch: std::env::consts::ARCH.to_string(),
            cpu_model: system
                .cpus()
                .first()
                .map(|cpu| cpu.brand().to_string())
                .unwrap_or_default(),
            physical_cores: System::physical_core_count().unwrap_or(0),
            logical_cores: system.cpus().len(),
            total_memory_bytes: system.total_memory(),
        }
    }

    /// Battery detail via the power-source API. `None` on hosts without a
    /// battery; read failures are logged and treated the same way.
    fn sample_battery() -> Option<BatterySample> {
        use battery::units::ratio::percent;
        use battery::units::thermodynamic_temperature::degree_celsius;
        use battery::units::time::second;

        let manager = match battery::Manager::new() {
            Ok(manager) => manager,
            Err(err) => {
                tracing::debug!(error = %err, "battery manager unavailable");
                return None;
            }
        };
        let bat = manager.batteries().ok()?.next()?.ok()?;
        let state = bat.state();
        Some(BatterySample {
            percent: f64::from(bat.state_of_charge().get::<percent>()),
            plugged: !matches!(state, battery::State::Discharging),
            state: state.to_string(),
            time_to_empty_sec: bat.time_to_empty().map(|t| t.get::<second>() as u64),
            time_to_full_sec: bat.time_to_full().map(|t| t.get::<second>() as u64),
            cycle_count: bat.cycle_count(),
            health_percent: Some(f64::from(bat.state_of_health().get::<percent>())),
            temperature_c: bat
                .temperature()
                .map(|t| f64::from(t.get::<degree_celsius>())),
        })
    }
}

#[async_trait]
impl Collector for SystemCollector {
    fn name(&self) -> &'static str {
        SYSTEM
    }

    async fn collect(&self) -> Result<SampleData> {
        let mut state = self.state.lock().await;

        // CPU usage is a delta between two refreshes.
        state.system.refresh_cpu_usage();
        tokio::time::sleep(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL).await;
        state.system.refresh_cpu_usage();
        state.system.refresh_memory();
        state.disks.refresh(true);

        let load = System::load_average();
        let (disk_root, disk_mounts, disk_io) =
            Self::sample_disks(&state.disks, self.disk_mounts_max);

        Ok(SampleData {
            cpu: Some(Self::sample_cpu(&state.system)),
            memory: Some(Self::sample_memory(&state.system)),
            swap: Self::sample_swap(&state.system),
            disk_root,
            disk_mounts: Some(disk_mounts),
            disk_io: Some(disk_io),
            battery: Self::sample_battery(),
            uptime_sec: Some(System::uptime()),
            load_average: Some(LoadAverage {
                one: load.one,
                five: load.five,
                fifteen: load.fifteen,
            }),
            system_info: self
                .include_system_info
                .then(|| Self::sample_system_info(&state.system)),
            ..Default::default()
        })
    }
}

fn percent_of(used: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        (used as f64 / total as f64) * 100.0
    }
}
