//! Block I/O statistics grouped by statistic group and operation.
//!
//! The Docker stats payload carries `blkio_stats` as a map of statistic groups
//! (`io_service_bytes_recursive`, `io_serviced_recursive`, ...) to flat record
//! lists. Every block I/O metric asks for one `(group, op)` slice, so the
//! records are partitioned once when the view is built.

use ahash::AHashMap as HashMap;
use serde::Deserialize;
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use tracing::trace;

use crate::device::DeviceNameResolver;
use crate::error::{DeviceLookupError, ExtractError, ExtractResult};
use crate::payload;

/// Statistic group holding byte counts.
pub const SERVICE_BYTES: &str = "io_service_bytes_recursive";
/// Statistic group holding operation counts.
pub const SERVICED: &str = "io_serviced_recursive";

/// Operation class of a block I/O record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpKind {
    Read,
    Write,
    Sync,
    Async,
    Discard,
    Total,
}

impl OpKind {
    pub const ALL: [OpKind; 6] = [
        OpKind::Read,
        OpKind::Write,
        OpKind::Sync,
        OpKind::Async,
        OpKind::Discard,
        OpKind::Total,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            OpKind::Read => "read",
            OpKind::Write => "write",
            OpKind::Sync => "sync",
            OpKind::Async => "async",
            OpKind::Discard => "discard",
            OpKind::Total => "total",
        }
    }
}

impl fmt::Display for OpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for an op string outside the recognized set.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown block I/O operation: {0}")]
pub struct UnknownOp(pub String);

impl FromStr for OpKind {
    type Err = UnknownOp;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_ascii_lowercase();
        OpKind::ALL
            .into_iter()
            .find(|op| op.as_str() == lower)
            .ok_or_else(|| UnknownOp(s.to_string()))
    }
}

/// One raw record as it appears in the payload.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BlkioRecord {
    pub major: u64,
    pub minor: u64,
    pub op: String,
    pub value: u64,
}

/// A record with its device name resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlkioEntry {
    pub device: String,
    pub major: u64,
    pub minor: u64,
    pub op: String,
    pub value: u64,
}

/// Block I/O records of one payload, partitioned by group and operation.
pub struct BlockIoStatsView<'a> {
    resolver: &'a DeviceNameResolver,
    groups: HashMap<String, HashMap<OpKind, Vec<BlkioRecord>>>,
}

impl<'a> BlockIoStatsView<'a> {
    /// Builds the view from the `blkio_stats` section.
    ///
    /// `null` groups are treated as empty. Records with an operation outside
    /// [`OpKind::ALL`] are dropped.
    pub fn new(resolver: &'a DeviceNameResolver, section: &Value) -> ExtractResult<Self> {
        let mut groups = HashMap::new();

        let Some(section) = section.as_object() else {
            if section.is_null() {
                return Ok(Self { resolver, groups });
            }
            return Err(ExtractError::Malformed {
                path: "blkio_stats".to_string(),
                expected: "object",
            });
        };

        for (name, records) in section {
            let records = match records {
                Value::Null => continue,
                Value::Array(items) => items,
                _ => {
                    return Err(ExtractError::Malformed {
                        path: format!("blkio_stats.{}", name),
                        expected: "array",
                    })
                }
            };

            let mut partitions: HashMap<OpKind, Vec<BlkioRecord>> = HashMap::new();
            for (idx, item) in records.iter().enumerate() {
                let record = BlkioRecord::deserialize(item).map_err(|_| ExtractError::Malformed {
                    path: format!("blkio_stats.{}[{}]", name, idx),
                    expected: "{major, minor, op, value} record",
                })?;
                match record.op.parse::<OpKind>() {
                    Ok(op) => partitions.entry(op).or_default().push(record),
                    Err(e) => trace!("Skipping record in {}: {}", name, e),
                }
            }
            groups.insert(name.clone(), partitions);
        }

        Ok(Self { resolver, groups })
    }

    /// Builds the view from a whole stats payload; a missing `blkio_stats`
    /// section gives an empty view.
    pub fn from_stats(resolver: &'a DeviceNameResolver, stats: &Value) -> ExtractResult<Self> {
        match payload::lookup(stats, &["blkio_stats"]) {
            Some(section) => Self::new(resolver, section),
            None => Ok(Self {
                resolver,
                groups: HashMap::new(),
            }),
        }
    }

    /// Records of `group` with operation `op`, in payload order, device names
    /// resolved lazily.
    pub fn iter<'s>(
        &'s self,
        group: &str,
        op: OpKind,
    ) -> impl Iterator<Item = Result<BlkioEntry, DeviceLookupError>> + 's {
        resolve_records(self.resolver, self.records(group, op))
    }

    /// Like [`iter`](Self::iter) with the operation given as text, matched
    /// case-insensitively. Unknown operations yield nothing.
    pub fn iter_named<'s>(
        &'s self,
        group: &str,
        op: &str,
    ) -> impl Iterator<Item = Result<BlkioEntry, DeviceLookupError>> + 's {
        let records = op
            .parse::<OpKind>()
            .map(|op| self.records(group, op))
            .unwrap_or(&[]);
        resolve_records(self.resolver, records)
    }

    fn records(&self, group: &str, op: OpKind) -> &[BlkioRecord] {
        self.groups
            .get(group)
            .and_then(|partitions| partitions.get(&op))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Names of the statistic groups present in the payload.
    pub fn groups(&self) -> impl Iterator<Item = &str> {
        self.groups.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.groups.values().all(|p| p.values().all(Vec::is_empty))
    }
}

fn resolve_records<'s>(
    resolver: &'s DeviceNameResolver,
    records: &'s [BlkioRecord],
) -> impl Iterator<Item = Result<BlkioEntry, DeviceLookupError>> + 's {
    records.iter().map(move |record| {
        let device = resolver.resolve(record.major, record.minor)?;
        Ok(BlkioEntry {
            device,
            major: record.major,
            minor: record.minor,
            op: record.op.clone(),
            value: record.value,
        })
    })
}
