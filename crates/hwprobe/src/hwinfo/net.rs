use std::collections::BTreeMap;
use std::path::Path;

use async_trait::async_trait;

use super::util::*;
use super::{Domain, Finding, Probe, UNKNOWN};
use crate::ProbeResult;

const SYS_CLASS_NET: &str = "/sys/class/net";

const LOOPBACK: &str = "lo";

#[non_exhaustive]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceRecord {
    pub mac: String,
    pub state: String,
}

impl Default for InterfaceRecord {
    fn default() -> Self {
        Self {
            mac: UNKNOWN.to_owned(),
            state: UNKNOWN.to_owned(),
        }
    }
}

pub struct NetworkProbe;

#[async_trait]
impl Probe for NetworkProbe {
    fn domain(&self) -> Domain {
        Domain::Network
    }

    async fn collect(&self, accessor: &dyn Accessor) -> Finding {
        Finding::Network(get_interfaces(accessor).await)
    }
}

pub async fn get_interfaces(
    accessor: &dyn Accessor,
) -> ProbeResult<BTreeMap<String, InterfaceRecord>> {
    let names = match accessor.list_dir(Path::new(SYS_CLASS_NET)).await {
        Ok(names) => names,
        Err(e) if e.is_not_found() => return ProbeResult::failure(e.to_string()),
        Err(e) => return ProbeResult::failure(format!("network probe error: {e}")),
    };

    let mut ret = BTreeMap::new();

    for name in names {
        if name == LOOPBACK {
            continue;
        }

        let interface = get_interface(accessor, &name).await;
        ret.insert(name, interface);
    }

    ProbeResult::Success(ret)
}

async fn get_interface(accessor: &dyn Accessor, name: &str) -> InterfaceRecord {
    let mut interface = InterfaceRecord::default();

    match read_string(accessor, format!("{SYS_CLASS_NET}/{name}/address")).await {
        Ok(mac) if !mac.is_empty() => interface.mac = mac,
        Ok(_) => (),
        Err(e) => debug!("{name}: {e}"),
    }

    match read_string(accessor, format!("{SYS_CLASS_NET}/{name}/operstate")).await {
        Ok(state) if !state.is_empty() => interface.state = state,
        Ok(_) => (),
        Err(e) => debug!("{name}: {e}"),
    }

    interface
}
