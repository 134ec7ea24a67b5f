pub mod aggregate;
pub mod anon;
pub mod color;
pub mod columns;
pub mod feed;
pub mod job_graph;
pub mod layout;
pub mod model;
pub mod registry;

pub use aggregate::{Aggregation, ClusterTotals, HostSummary};
pub use anon::Anonymizer;
pub use color::ColorId;
pub use columns::{Column, ColumnKind, COLUMNS};
pub use feed::{apply_event, FeedEvent, FeedOutcome, FrameError};
pub use job_graph::{GraphJob, JobGraph};
pub use layout::{ColumnWidth, Placement};
pub use model::{Host, HostId, Job, JobClass, JobId};
pub use registry::Registry;
