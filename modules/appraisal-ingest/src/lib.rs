pub mod error;
pub mod join;
pub mod layout;
pub mod pipeline;
pub mod plans;
pub mod reader;

pub use error::{IngestError, Result};
pub use layout::{ColumnSource, ColumnSpec, Layout, RowFilter, SourceFormat};
pub use pipeline::{BulkIngestionPipeline, IngestOptions};
pub use plans::{Aggregate, AuxSource, IngestPlan, IngestSettings};
pub use reader::{Input, RowReader};
