//! Session context: typed access to the artifact store.

use rasan_core::{
    AnalysisResult, ArtifactKey, DatasetDescriptor, PipelineError, PipelineResult,
    PredictionResult, PreprocessRecord, Stage, TrainingResult, VisualizationSet,
};
use rasan_storage::{ArtifactStore, ArtifactStoreExt, StorageResult};
use std::sync::Arc;
use uuid::Uuid;

/// Every artifact currently in the store.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StageArtifacts {
    pub dataset: Option<DatasetDescriptor>,
    pub preprocess: Option<PreprocessRecord>,
    pub analysis: Option<AnalysisResult>,
    pub training: Option<TrainingResult>,
    pub visualizations: Option<VisualizationSet>,
    pub prediction: Option<PredictionResult>,
}

impl StageArtifacts {
    pub fn has(&self, key: ArtifactKey) -> bool {
        match key {
            ArtifactKey::UploadedFile => self.dataset.is_some(),
            ArtifactKey::PreprocessedData => self.preprocess.is_some(),
            ArtifactKey::AnalysisResult => self.analysis.is_some(),
            ArtifactKey::TrainingResult => self.training.is_some(),
            ArtifactKey::Visualizations => self.visualizations.is_some(),
            ArtifactKey::PredictionResult => self.prediction.is_some(),
        }
    }

    /// Filename for downstream calls: the preprocessed file when one exists,
    /// else the uploaded file.
    pub fn working_filename(&self) -> Option<String> {
        self.preprocess
            .as_ref()
            .and_then(|p| p.filename())
            .map(str::to_string)
            .or_else(|| self.dataset.as_ref().map(|d| d.filename.clone()))
    }
}

/// Outcome of a precondition check.
#[derive(Debug, Clone, PartialEq)]
pub enum StageReadiness {
    Ready(StageArtifacts),
    MissingPrerequisite {
        stage: Stage,
        missing: ArtifactKey,
        redirect_to: Stage,
    },
}

impl StageReadiness {
    pub fn is_ready(&self) -> bool {
        matches!(self, StageReadiness::Ready(_))
    }

    pub fn into_result(self) -> PipelineResult<StageArtifacts> {
        match self {
            StageReadiness::Ready(artifacts) => Ok(artifacts),
            StageReadiness::MissingPrerequisite {
                stage,
                missing,
                redirect_to,
            } => Err(PipelineError::MissingPrerequisite {
                stage,
                missing,
                redirect_to,
            }),
        }
    }
}

/// Explicit handle on the persisted pipeline state.
#[derive(Clone)]
pub struct Session {
    id: Uuid,
    store: Arc<dyn ArtifactStore>,
}

impl Session {
    pub fn new(store: Arc<dyn ArtifactStore>) -> Self {
        Self {
            id: Uuid::now_v7(),
            store,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn store(&self) -> &dyn ArtifactStore {
        self.store.as_ref()
    }

    pub fn dataset(&self) -> StorageResult<Option<DatasetDescriptor>> {
        self.store.get()
    }

    pub fn preprocess(&self) -> StorageResult<Option<PreprocessRecord>> {
        self.store.get()
    }

    pub fn analysis(&self) -> StorageResult<Option<AnalysisResult>> {
        self.store.get()
    }

    pub fn training(&self) -> StorageResult<Option<TrainingResult>> {
        self.store.get()
    }

    pub fn visualizations(&self) -> StorageResult<Option<VisualizationSet>> {
        self.store.get()
    }

    pub fn prediction(&self) -> StorageResult<Option<PredictionResult>> {
        self.store.get()
    }

    pub fn snapshot(&self) -> StorageResult<StageArtifacts> {
        Ok(StageArtifacts {
            dataset: self.dataset()?,
            preprocess: self.preprocess()?,
            analysis: self.analysis()?,
            training: self.training()?,
            visualizations: self.visualizations()?,
            prediction: self.prediction()?,
        })
    }

    /// Check `stage`'s prerequisites. The redirect target is the producer of
    /// the first missing artifact.
    pub fn check(&self, stage: Stage) -> StorageResult<StageReadiness> {
        let artifacts = self.snapshot()?;
        let missing = stage
            .prerequisites()
            .iter()
            .copied()
            .find(|key| !artifacts.has(*key));
        Ok(match missing {
            Some(missing) => StageReadiness::MissingPrerequisite {
                stage,
                missing,
                redirect_to: missing.producer(),
            },
            None => StageReadiness::Ready(artifacts),
        })
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session").field("id", &self.id).finish()
    }
}
