/*!
Rows of the Sentry risk table
*/

use serde::{Deserialize, Serialize};

use crate::score::Score;

/// One object from the Sentry summary table.
///
/// Only `id`, `ps_cum` and `ts_max` take part in change detection. The rest
/// is carried for display.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackedObject {
    /// Stable Sentry identifier, e.g. `a0101955`
    pub id: String,
    /// Full designation including name, e.g. `101955 Bennu (1999 RQ36)`
    #[serde(default)]
    pub fullname: String,
    /// Primary designation, used to build the details link
    #[serde(default)]
    pub des: String,
    /// Range of years with potential impacts
    #[serde(default)]
    pub range: String,
    /// Cumulative Palermo Scale
    pub ps_cum: Score,
    /// Maximum Torino Scale, absent when unrated
    #[serde(default)]
    pub ts_max: Option<Score>,
    /// Maximum Palermo Scale
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ps_max: Option<Score>,
    /// Cumulative impact probability
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
    /// Estimated diameter in km
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diameter: Option<String>,
    /// Number of potential impacts
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n_imp: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_obs: Option<String>,
}

impl TrackedObject {
    /// Best available human-readable name
    pub fn display_name(&self) -> &str {
        if !self.fullname.trim().is_empty() {
            self.fullname.trim()
        } else if !self.des.is_empty() {
            &self.des
        } else {
            &self.id
        }
    }
}

/// The subset of a [`TrackedObject`] kept between runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedObject {
    pub id: String,
    pub ps_cum: Score,
    #[serde(default)]
    pub ts_max: Option<Score>,
}

impl From<&TrackedObject> for SavedObject {
    fn from(object: &TrackedObject) -> Self {
        Self {
            id: object.id.clone(),
            ps_cum: object.ps_cum.clone(),
            ts_max: object.ts_max.clone(),
        }
    }
}
