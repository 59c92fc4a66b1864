//! Process-table collector: top N by CPU, then memory.

use async_trait::async_trait;
use sysinfo::{ProcessRefreshKind, ProcessesToUpdate, System};

use crate::collector::{Collector, SampleData, PROCESS};
use crate::error::Result;
use crate::snapshot::types::ProcessSample;

pub struct ProcessCollector {
    system: tokio::sync::Mutex<System>,
    top_n: usize,
}

impl ProcessCollector {
    pub fn new(top_n: usize) -> Self {
        Self {
            system: tokio::sync::Mutex::new(System::new()),
            top_n: top_n.clamp(1, 200),
        }
    }
}

#[async_trait]
impl Collector for ProcessCollector {
    fn name(&self) -> &'static str {
        PROCESS
    }

    async fn collect(&self) -> Result<SampleData> {
        let mut system = self.system.lock().await;
        system.refresh_memory();
        system.refresh_processes_specifics(
            ProcessesToUpdate::All,
            true,
            ProcessRefreshKind::nothing().with_cpu().with_memory(),
        );

        let total_memory = system.total_memory();
        let mut processes: Vec<ProcessSample> = system
            .processes()
            .values()
            .map(|proc| {
                let memory = proc.memory();
                ProcessSample {
                    pid: proc.pid().as_u32(),
                    name: proc.name().to_string_lossy().to_string(),
                    cpu_percent: f64::from(proc.cpu_usage()),
                    memory_bytes: memory,
                    memory_percent: if total_memory > 0 {
                        (memory as f64 / total_memory as f64) * 100.0
                    } else {
                        0.0
                    },
                    status: proc.status().to_string(),
                    start_time_sec: proc.start_time(),
                }
            })
            .collect();

        processes.sort_by(|a, b| {
            b.cpu_percent
                .partial_cmp(&a.cpu_percent)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| b.memory_percent.total_cmp(&a.memory_percent))
        });
        processes.truncate(self.top_n);

        Ok(SampleData {
            processes: Some(processes),
            ..Default::default()
        })
    }
}
