//! Core to socket/APIC mapping built from cpuinfo records

use std::collections::HashMap;

use crate::error::{EsmiError, Result};

/// Highest logical CPU number accepted from cpuinfo
pub const MAX_PROCESSOR_INDEX: u32 = u16::MAX as u32;

/// Where one logical CPU lives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CoreMapping {
    pub socket: u32,
    /// Local APIC id, the address HSMP uses for per-core commands
    pub apic_id: u32,
    /// No usable record was found; socket and APIC id are placeholders
    pub degraded: bool,
}

/// Vendor and family/model of the processors
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CpuIdentity {
    pub vendor: String,
    pub family: u32,
    pub model: u32,
}

/// Immutable topology snapshot taken at init
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CpuTopology {
    pub identity: CpuIdentity,
    pub sockets: u32,
    pub threads_per_core: u32,
    cores: Vec<CoreMapping>,
}

impl CpuTopology {
    pub fn cores(&self) -> &[CoreMapping] {
        &self.cores
    }

    /// Number of logical CPUs
    pub fn core_count(&self) -> u32 {
        self.cores.len() as u32
    }

    /// Number of physical cores (SMT siblings folded)
    pub fn physical_cores(&self) -> u32 {
        (self.core_count() / self.threads_per_core).max(1)
    }

    pub fn core(&self, index: u32) -> Option<&CoreMapping> {
        self.cores.get(index as usize)
    }

    /// Lowest-numbered core with a real mapping on `socket`
    pub fn first_core_on_socket(&self, socket: u32) -> Option<u32> {
        self.cores
            .iter()
            .position(|c| !c.degraded && c.socket == socket)
            .map(|i| i as u32)
    }

    pub fn degraded_cores(&self) -> Vec<u32> {
        self.cores
            .iter()
            .enumerate()
            .filter(|(_, c)| c.degraded)
            .map(|(i, _)| i as u32)
            .collect()
    }
}

#[derive(Debug, Default)]
struct Record {
    processor: Option<u32>,
    physical_id: Option<u32>,
    apic_id: Option<u32>,
    vendor: Option<String>,
    family: Option<u32>,
    model: Option<u32>,
    siblings: Option<u32>,
    cpu_cores: Option<u32>,
}

fn parse_field(key: &str, value: &str) -> Result<u32> {
    value
        .parse::<u32>()
        .map_err(|e| EsmiError::ParseError(format!("cpuinfo field '{key}' = {value:?}: {e}")))
}

fn parse_records(text: &str) -> Result<Vec<Record>> {
    let mut records = Vec::new();
    let mut current = Record::default();
    let mut in_record = false;

    for line in text.lines() {
        if line.trim().is_empty() {
            if in_record {
                records.push(std::mem::take(&mut current));
                in_record = false;
            }
            continue;
        }

        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let key = key.trim();
        let value = value.trim();
        in_record = true;

        match key {
            "processor" => current.processor = Some(parse_field(key, value)?),
            "physical id" => current.physical_id = Some(parse_field(key, value)?),
            "apicid" => current.apic_id = Some(parse_field(key, value)?),
            "vendor_id" => current.vendor = Some(value.to_string()),
            "cpu family" => current.family = Some(parse_field(key, value)?),
            "model" => current.model = Some(parse_field(key, value)?),
            "siblings" => current.siblings = Some(parse_field(key, value)?),
            "cpu cores" => current.cpu_cores = Some(parse_field(key, value)?),
            _ => {}
        }
    }
    if in_record {
        records.push(current);
    }

    Ok(records)
}

/// Build the topology map from cpuinfo text
///
/// Core indices are dense from 0 to the highest processor number. A core
/// without a complete record keeps socket 0 / APIC 0 and is flagged
/// degraded instead of failing the build.
pub fn build_topology(text: &str) -> Result<CpuTopology> {
    let records = parse_records(text)?;

    let mut by_processor: HashMap<u32, &Record> = HashMap::new();
    for record in &records {
        if let Some(p) = record.processor {
            if by_processor.insert(p, record).is_some() {
                tracing::warn!("Duplicate cpuinfo record for processor {p}, keeping the last");
            }
        }
    }

    let Some(&max_processor) = by_processor.keys().max() else {
        return Err(EsmiError::ParseError(
            "no processor records in cpuinfo".to_string(),
        ));
    };

    if max_processor > MAX_PROCESSOR_INDEX {
        return Err(EsmiError::ParseError(format!(
            "processor {max_processor} beyond supported maximum {MAX_PROCESSOR_INDEX}"
        )));
    }

    let count = max_processor as usize + 1;
    let mut cores = Vec::new();
    cores
        .try_reserve_exact(count)
        .map_err(|_| EsmiError::OutOfMemory)?;

    for index in 0..=max_processor {
        let mapping = match by_processor.get(&index) {
            Some(Record {
                physical_id: Some(socket),
                apic_id: Some(apic_id),
                ..
            }) => CoreMapping {
                socket: *socket,
                apic_id: *apic_id,
                degraded: false,
            },
            _ => {
                tracing::warn!("No complete topology record for core {index}, mapping degraded");
                CoreMapping {
                    socket: 0,
                    apic_id: 0,
                    degraded: true,
                }
            }
        };
        cores.push(mapping);
    }

    let first = records
        .iter()
        .find(|r| r.processor.is_some())
        .ok_or_else(|| EsmiError::ParseError("no processor records in cpuinfo".to_string()))?;

    let identity = CpuIdentity {
        vendor: first.vendor.clone().unwrap_or_default(),
        family: first.family.unwrap_or(0),
        model: first.model.unwrap_or(0),
    };

    let threads_per_core = match (first.siblings, first.cpu_cores) {
        (Some(siblings), Some(cpu_cores)) if cpu_cores > 0 && siblings >= cpu_cores => {
            siblings / cpu_cores
        }
        _ => 1,
    };

    let sockets = cores
        .iter()
        .filter(|c| !c.degraded)
        .map(|c| c.socket + 1)
        .max()
        .unwrap_or(1);

    tracing::debug!(
        "Topology: {} cores, {} sockets, {} threads/core, {} degraded",
        cores.len(),
        sockets,
        threads_per_core,
        cores.iter().filter(|c| c.degraded).count()
    );

    Ok(CpuTopology {
        identity,
        sockets,
        threads_per_core,
        cores,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::fake::cpuinfo;

    #[test]
    fn test_two_socket_smt_layout() {
        let topo = build_topology(&cpuinfo(2, 8, 2, 0x19, 0x11)).unwrap();

        assert_eq!(topo.core_count(), 16);
        assert_eq!(topo.sockets, 2);
        assert_eq!(topo.threads_per_core, 2);
        assert_eq!(topo.physical_cores(), 8);
        assert_eq!(topo.identity.vendor, "AuthenticAMD");
        assert_eq!(topo.identity.family, 0x19);
        assert_eq!(topo.identity.model, 0x11);

        // cpu 9 is the sibling of cpu 1
        assert_eq!(topo.core(1).unwrap().socket, 0);
        assert_eq!(topo.core(9).unwrap().socket, 0);
        assert_eq!(topo.core(9).unwrap().apic_id, topo.core(1).unwrap().apic_id | 1);
        assert_eq!(topo.core(4).unwrap().socket, 1);

        assert_eq!(topo.first_core_on_socket(0), Some(0));
        assert_eq!(topo.first_core_on_socket(1), Some(4));
        assert_eq!(topo.first_core_on_socket(2), None);
        assert!(topo.degraded_cores().is_empty());
    }

    #[test]
    fn test_missing_record_is_degraded_not_fatal() {
        let text = "processor\t: 0\nphysical id\t: 0\napicid\t: 0\n\n\
                    processor\t: 2\nphysical id\t: 1\napicid\t: 64\n\n\
                    processor\t: 3\nphysical id\t: 1\n\n";
        let topo = build_topology(text).unwrap();

        assert_eq!(topo.core_count(), 4);
        assert_eq!(topo.degraded_cores(), vec![1, 3]);
        assert_eq!(
            *topo.core(1).unwrap(),
            CoreMapping {
                socket: 0,
                apic_id: 0,
                degraded: true
            }
        );
        assert_eq!(topo.sockets, 2);
        assert_eq!(topo.first_core_on_socket(1), Some(2));
        assert_eq!(topo.threads_per_core, 1);
    }

    #[test]
    fn test_malformed_integer_is_parse_error() {
        let text = "processor\t: 0\nphysical id\t: zero\napicid\t: 0\n";
        assert!(matches!(
            build_topology(text),
            Err(EsmiError::ParseError(_))
        ));
    }

    #[test]
    fn test_absurd_processor_index_is_rejected() {
        let text = "processor : 0\nphysical id : 0\napicid : 0\n\n\
                    processor : 4000000000\nphysical id : 0\napicid : 2\n";
        assert!(matches!(
            build_topology(text),
            Err(EsmiError::ParseError(_))
        ));

        let edge = format!("processor : {MAX_PROCESSOR_INDEX}\nphysical id : 0\napicid : 0\n");
        let topo = build_topology(&edge).unwrap();
        assert_eq!(topo.core_count(), MAX_PROCESSOR_INDEX + 1);
    }

    #[test]
    fn test_empty_source_is_parse_error() {
        assert!(matches!(build_topology(""), Err(EsmiError::ParseError(_))));
        assert!(matches!(
            build_topology("flags\t: fpu vme\n"),
            Err(EsmiError::ParseError(_))
        ));
    }

    #[test]
    fn test_records_without_trailing_blank_line() {
        let text = "processor : 0\nphysical id : 0\napicid : 0\n\nprocessor : 1\nphysical id : 0\napicid : 2";
        let topo = build_topology(text).unwrap();
        assert_eq!(topo.core_count(), 2);
        assert_eq!(topo.core(1).unwrap().apic_id, 2);
    }
}
