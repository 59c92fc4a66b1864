//! Network counters collector.

use async_trait::async_trait;
use sysinfo::Networks;

use crate::collector::{Collector, SampleData, NETWORK};
use crate::error::Result;
use crate::snapshot::types::{InterfaceSample, NetworkSample};

/// Caps the per-interface breakdown; hosts with many virtual interfaces
/// would otherwise bloat every snapshot.
const INTERFACES_MAX: usize = 50;

pub struct NetworkCollector {
    networks: tokio::sync::Mutex<Networks>,
    per_interface: bool,
}

impl NetworkCollector {
    pub fn new(per_interface: bool) -> Self {
        Self {
            networks: tokio::sync::Mutex::new(Networks::new_with_refreshed_list()),
            per_interface,
        }
    }
}

#[async_trait]
impl Collector for NetworkCollector {
    fn name(&self) -> &'static str {
        NETWORK
    }

    async fn collect(&self) -> Result<SampleData> {
        let mut networks = self.networks.lock().await;
        networks.refresh(true);

        let mut sample = NetworkSample {
            bytes_sent: 0,
            bytes_recv: 0,
            packets_sent: 0,
            packets_recv: 0,
            errors_in: 0,
            errors_out: 0,
            interfaces: Vec::new(),
        };
        for (name, data) in networks.iter() {
            sample.bytes_sent += data.total_transmitted();
            sample.bytes_recv += data.total_received();
            sample.packets_sent += data.total_packets_transmitted();
            sample.packets_recv += data.total_packets_received();
            sample.errors_in += data.total_errors_on_received();
            sample.errors_out += data.total_errors_on_transmitted();
            if self.per_interface && sample.interfaces.len() < INTERFACES_MAX {
                sample.interfaces.push(InterfaceSample {
                    name: name.clone(),
                    bytes_sent: data.total_transmitted(),
                    bytes_recv: data.total_received(),
                    mac_address: data.mac_address().to_string(),
                });
            }
        }

        Ok(SampleData {
            network: Some(sample),
            ..Default::default()
        })
    }
}
