use crate::config::AnalysisConfig;
use crate::deriver::FeatureDeriver;
use crate::errors::Result;
use crate::extractor::{ExtractionStats, RecordExtractor};
use crate::pgn_source::RawGame;
use crate::table::EnrichedTable;
use log::info;
use std::time::Instant;

/// Extractor and deriver wired together for one batch run
#[derive(Debug, Clone)]
pub struct Pipeline {
    extractor: RecordExtractor,
    deriver: FeatureDeriver,
}

impl Pipeline {
    pub fn new(extractor: RecordExtractor, deriver: FeatureDeriver) -> Self {
        Self { extractor, deriver }
    }

    pub fn from_config(config: &AnalysisConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::new(
            RecordExtractor::from_config(config),
            FeatureDeriver::from_config(config),
        ))
    }

    pub fn extractor(&self) -> &RecordExtractor {
        &self.extractor
    }

    pub fn deriver(&self) -> &FeatureDeriver {
        &self.deriver
    }

    /// Drain `source` through the extractor, then derive features over the
    /// materialized records.
    pub fn run<I>(&self, source: I) -> (EnrichedTable, ExtractionStats)
    where
        I: IntoIterator<Item = Result<RawGame>>,
    {
        let start_time = Instant::now();

        let (records, stats) = self.extractor.extract_all(source);
        let table = EnrichedTable::new(self.deriver.derive(records));

        info!(
            "Pipeline produced {} records from {} games in {:.2}s",
            table.len(),
            stats.entries_seen,
            start_time.elapsed().as_secs_f64()
        );
        (table, stats)
    }
}
