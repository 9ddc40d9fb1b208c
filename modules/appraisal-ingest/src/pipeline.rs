// Streaming bulk import. A blocking reader thread parses, filters, joins and
// normalizes rows into fixed-size batches; the async side upserts them one at
// a time. The bounded channel caps memory at depth × batch size.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{error, info, warn};

use appraisal_common::config::IngestConfig;
use appraisal_common::normalize::normalize_account;
use appraisal_common::{
    normalize_fields, ConflictMode, Field, ImportSummary, Property, PropertyPatch,
};
use appraisal_store::PropertyStore;

use crate::error::{IngestError, Result};
use crate::join::AuxLookup;
use crate::plans::IngestPlan;
use crate::reader::{open_input, Input, RowReader};

#[derive(Debug, Clone)]
pub struct IngestOptions {
    pub mode: ConflictMode,
    pub batch_size: usize,
    /// Batches buffered between reader and writer.
    pub channel_depth: usize,
    /// Stop after this many rows have been handed to the store.
    pub sample: Option<u64>,
    /// Write only the state class of each row, merging into stored records.
    pub state_class_only: bool,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self::from_config(&IngestConfig::default())
    }
}

impl IngestOptions {
    pub fn from_config(config: &IngestConfig) -> Self {
        Self {
            mode: ConflictMode::Overwrite,
            batch_size: config.batch_size,
            channel_depth: config.channel_depth,
            sample: None,
            state_class_only: false,
        }
    }
}

enum Batch {
    Records(Vec<Property>),
    Patches(Vec<PropertyPatch>),
}

impl Batch {
    fn empty(patches: bool, capacity: usize) -> Self {
        if patches {
            Batch::Patches(Vec::with_capacity(capacity))
        } else {
            Batch::Records(Vec::with_capacity(capacity))
        }
    }

    fn len(&self) -> usize {
        match self {
            Batch::Records(r) => r.len(),
            Batch::Patches(p) => p.len(),
        }
    }
}

/// A full batch plus the primary rows read when it was cut.
struct Flush {
    batch: Batch,
    rows_read: u64,
}

#[derive(Debug, Default)]
struct ReadCounts {
    rows_read: u64,
    rows_filtered: u64,
}

pub struct BulkIngestionPipeline {
    store: Arc<dyn PropertyStore>,
    options: IngestOptions,
}

impl BulkIngestionPipeline {
    pub fn new(store: Arc<dyn PropertyStore>, options: IngestOptions) -> Self {
        Self { store, options }
    }

    pub fn options(&self) -> &IngestOptions {
        &self.options
    }

    /// Open every file up front so a missing side file fails before any
    /// row is written.
    pub async fn ingest_paths(
        &self,
        plan: IngestPlan,
        primary: &std::path::Path,
        aux: &[std::path::PathBuf],
    ) -> Result<ImportSummary> {
        let primary = open_input(primary)?;
        let aux = aux
            .iter()
            .map(|p| open_input(p))
            .collect::<Result<Vec<_>>>()?;
        self.ingest(plan, primary, aux).await
    }

    /// Stream `primary` through `plan`. `aux` must supply one input per
    /// auxiliary source of the plan, in order.
    pub async fn ingest(
        &self,
        plan: IngestPlan,
        primary: Input,
        aux: Vec<Input>,
    ) -> Result<ImportSummary> {
        if aux.len() != plan.aux.len() {
            return Err(IngestError::layout(
                &plan.primary.name,
                format!(
                    "expected {} auxiliary file(s), got {}",
                    plan.aux.len(),
                    aux.len()
                ),
            ));
        }

        let district = plan.district;
        info!(
            district = %district,
            layout = plan.primary.name.as_str(),
            mode = ?self.options.mode,
            batch_size = self.options.batch_size,
            state_class_only = self.options.state_class_only,
            "Starting ingestion"
        );

        let (tx, mut rx) = mpsc::channel::<Flush>(self.options.channel_depth.max(1));
        let options = self.options.clone();
        let reader =
            tokio::task::spawn_blocking(move || read_batches(&plan, primary, aux, &options, &tx));

        let mut summary = ImportSummary::default();
        while let Some(Flush { batch, rows_read }) = rx.recv().await {
            let size = batch.len();
            match self.write(batch).await {
                Ok(written) => {
                    summary.rows_imported += written;
                    info!(
                        district = %district,
                        batch = size,
                        imported = summary.rows_imported,
                        read = rows_read,
                        "Upserted batch"
                    );
                }
                Err(e) => {
                    summary.batch_errors += 1;
                    error!(district = %district, batch = size, error = %e, "Batch upsert failed");
                }
            }
        }

        let counts = match reader.await? {
            Ok(counts) => counts,
            Err(e) => {
                error!(
                    district = %district,
                    imported = summary.rows_imported,
                    batch_errors = summary.batch_errors,
                    error = %e,
                    "Ingestion aborted"
                );
                return Err(e);
            }
        };
        summary.rows_read = counts.rows_read;
        summary.rows_filtered = counts.rows_filtered;

        info!(
            district = %district,
            rows_read = summary.rows_read,
            rows_imported = summary.rows_imported,
            rows_filtered = summary.rows_filtered,
            batch_errors = summary.batch_errors,
            "Ingestion complete"
        );
        Ok(summary)
    }

    async fn write(&self, batch: Batch) -> appraisal_store::Result<u64> {
        match batch {
            Batch::Records(records) => self.store.upsert(&records, self.options.mode).await,
            Batch::Patches(patches) if self.store.supports_partial_upsert() => {
                self.store.upsert_partial(&patches).await
            }
            Batch::Patches(patches) => self.read_modify_write(&patches).await,
        }
    }

    /// Partial merge for stores that can only replace whole records.
    async fn read_modify_write(&self, patches: &[PropertyPatch]) -> appraisal_store::Result<u64> {
        let mut merged = Vec::with_capacity(patches.len());
        for patch in patches {
            let mut record = self
                .store
                .get(patch.district, &patch.account_number)
                .await?
                .unwrap_or_else(|| Property::new(patch.district, patch.account_number.clone()));
            patch.apply(&mut record);
            merged.push(record);
        }
        self.store.upsert(&merged, ConflictMode::Overwrite).await
    }
}

/// Reader thread body. Returns once the input is exhausted, the sample
/// limit is hit, or the writer side has gone away.
fn read_batches(
    plan: &IngestPlan,
    primary: Input,
    aux: Vec<Input>,
    options: &IngestOptions,
    tx: &mpsc::Sender<Flush>,
) -> Result<ReadCounts> {
    let district = plan.district;
    let lookups = plan
        .aux
        .iter()
        .zip(aux)
        .map(|(source, input)| AuxLookup::load(district, source, input))
        .collect::<Result<Vec<_>>>()?;

    let batch_size = options.batch_size.max(1);
    let mut counts = ReadCounts::default();
    let mut emitted = 0u64;
    let mut batch = Batch::empty(options.state_class_only, batch_size);

    let rows = RowReader::open(&plan.primary, primary)?;
    if options.sample == Some(0) {
        info!(district = %district, "Sample of zero rows; nothing to read");
        return Ok(counts);
    }

    for row in rows {
        let mut fields = row?;
        counts.rows_read += 1;

        // Keyless rows are dropped silently; they only show up in rows_read.
        if normalize_account(district, fields.get(Field::AccountNumber)).is_empty() {
            continue;
        }
        if !plan.primary.keeps(&fields) {
            counts.rows_filtered += 1;
            continue;
        }
        for lookup in &lookups {
            lookup.enrich(&mut fields);
        }
        let Some(property) = normalize_fields(district, &fields) else {
            continue;
        };

        match &mut batch {
            Batch::Records(records) => records.push(property),
            Batch::Patches(patches) => match property.state_class {
                Some(class) => patches.push(PropertyPatch::state_class_only(
                    district,
                    property.account_number,
                    class,
                )),
                None => {
                    counts.rows_filtered += 1;
                    continue;
                }
            },
        }
        emitted += 1;

        if batch.len() >= batch_size {
            let full = std::mem::replace(
                &mut batch,
                Batch::empty(options.state_class_only, batch_size),
            );
            if tx
                .blocking_send(Flush {
                    batch: full,
                    rows_read: counts.rows_read,
                })
                .is_err()
            {
                warn!(district = %district, "Writer stopped; ending read early");
                return Ok(counts);
            }
        }

        if options.sample.is_some_and(|limit| emitted >= limit) {
            info!(district = %district, sample = emitted, "Sample limit reached");
            break;
        }
    }

    if batch.len() > 0 {
        // A closed channel here means the writer is gone; nothing to report.
        let _ = tx.blocking_send(Flush {
            batch,
            rows_read: counts.rows_read,
        });
    }
    Ok(counts)
}
