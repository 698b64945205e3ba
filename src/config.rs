use serde::{Deserialize, Serialize};

use crate::features::DetectorConfig;
use crate::matching::MatcherConfig;
use crate::optimization::ransac::RansacConfig;
use crate::tracker::TrackerConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub detector: DetectorConfig,
    pub matcher: MatcherConfig,
    pub ransac: RansacConfig,
    pub tracker: TrackerConfig,
    /// Features detected in the reference image when matching two images.
    pub feature_budget: usize,
    /// Stop a sequence at the first frame that fails instead of recording
    /// the failure and moving on.
    pub fail_fast: bool,
    /// Mark located markers on the output frames.
    pub draw_markers: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            detector: DetectorConfig::default(),
            matcher: MatcherConfig::default(),
            ransac: RansacConfig::default(),
            tracker: TrackerConfig::default(),
            feature_budget: 150,
            fail_fast: false,
            draw_markers: false,
        }
    }
}
