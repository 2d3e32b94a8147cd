//! Scan orchestration: bucket enumeration, per-bucket posture findings,
//! object sampling, content classification, and finding generation — fanned
//! out across bounded worker pools and fanned back in over four channels.

pub mod config;
pub mod error;
pub mod iam_scan;
pub mod sampling;
pub mod scanner;
pub mod types;

pub use config::PipelineConfig;
pub use error::PipelineError;
pub use iam_scan::scan_iam;
pub use scanner::{classifications_from_result, scan_storage, ScanOutputs};
pub use types::{
    Asset, AssetResourceType, Classification, ClassificationResult, ComplianceFramework, Finding, FindingType,
    ScanError, ScanPhase,
};
