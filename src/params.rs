//! Persisted hand parameter set.
//!
//! finger name → joint name → [`JointParams`].  Loaded in full at start-up
//! and rewritten in full on every calibration change.  The on-disk form is
//! JSON; the core only sees the typed structure.  Joints keep the order
//! they have in the file, which is the proximal-to-distal order of the
//! finger, and a rewrite preserves it.

use std::collections::{BTreeMap, BTreeSet};

use heapless::FnvIndexMap;
use serde::{Deserialize, Serialize};

use crate::app::ports::StoreError;
use crate::error::{Error, Result};
use crate::servo::control_table::ServoModel;
use crate::servo::is_valid_id;

/// Calibration and identity of one joint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JointParams {
    /// Bus id of the servo driving this joint.
    pub id: u8,
    /// Servo count at `min_deg`.
    pub min: i32,
    /// Servo count at `max_deg`.
    pub max: i32,
    /// Neutral count, carried through unchanged.
    #[serde(rename = "int", default, skip_serializing_if = "Option::is_none")]
    pub neutral: Option<i32>,
    pub min_deg: f64,
    pub max_deg: f64,
    /// Written to the servo's reverse drive flag at bring-up.
    pub reverse: bool,
    /// Calibration offset added to the goal at transmission time.
    #[serde(default)]
    pub offset: i32,
    /// Overrides the hand-wide servo model.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<ServoModel>,
}

/// Most joints one finger can carry.
pub const MAX_JOINTS_PER_FINGER: usize = 8;

/// joint name → params, in file order
pub type FingerParams = FnvIndexMap<String, JointParams, MAX_JOINTS_PER_FINGER>;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HandParams {
    fingers: BTreeMap<String, FingerParams>,
}

// heapless' `IndexMap: PartialEq` needs `V: Eq`, which `JointParams` (f64
// fields) cannot be; compare field-wise, keeping joint order significant.
impl PartialEq for HandParams {
    fn eq(&self, other: &Self) -> bool {
        self.fingers.len() == other.fingers.len()
            && self.fingers.iter().zip(other.fingers.iter()).all(|((na, fa), (nb, fb))| {
                na == nb && fa.len() == fb.len() && fa.iter().zip(fb.iter()).all(|(a, b)| a == b)
            })
    }
}

impl HandParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(text: &str) -> core::result::Result<Self, StoreError> {
        serde_json::from_str(text).map_err(|e| StoreError::Corrupted(e.to_string()))
    }

    pub fn to_json_pretty(&self) -> core::result::Result<String, StoreError> {
        serde_json::to_string_pretty(self).map_err(|e| StoreError::Io(e.to_string()))
    }

    /// Add or replace one joint.  Fails if the finger already holds
    /// [`MAX_JOINTS_PER_FINGER`] other joints.
    pub fn insert(&mut self, finger: &str, joint: &str, params: JointParams) -> Result<()> {
        self.fingers
            .entry(finger.to_string())
            .or_default()
            .insert(joint.to_string(), params)
            .map(|_| ())
            .map_err(|_| {
                Error::InvalidParams(format!(
                    "finger {finger:?} has more than {MAX_JOINTS_PER_FINGER} joints"
                ))
            })
    }

    /// Add or replace a whole finger.
    pub fn insert_finger(&mut self, finger: &str, joints: FingerParams) {
        self.fingers.insert(finger.to_string(), joints);
    }

    pub fn finger(&self, name: &str) -> Option<&FingerParams> {
        self.fingers.get(name)
    }

    pub fn joint(&self, finger: &str, joint: &str) -> Option<&JointParams> {
        self.fingers.get(finger)?.get(joint)
    }

    pub fn fingers(&self) -> impl Iterator<Item = (&String, &FingerParams)> {
        self.fingers.iter()
    }

    pub fn finger_names(&self) -> impl Iterator<Item = &String> {
        self.fingers.keys()
    }

    pub fn joint_count(&self) -> usize {
        self.fingers.values().map(|joints| joints.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.fingers.is_empty()
    }

    /// Reject sets the mapping layer cannot use.
    pub fn validate(&self) -> Result<()> {
        if self.fingers.is_empty() {
            return Err(Error::InvalidParams("no fingers defined".into()));
        }
        let mut seen = BTreeSet::new();
        for (finger, joints) in &self.fingers {
            if joints.is_empty() {
                return Err(Error::InvalidParams(format!("finger {finger:?} has no joints")));
            }
            for (joint, p) in joints {
                let at = || format!("{finger}/{joint}");
                if !is_valid_id(p.id) {
                    return Err(Error::InvalidParams(format!("{}: id {} outside 1-252", at(), p.id)));
                }
                if !seen.insert(p.id) {
                    return Err(Error::InvalidParams(format!("{}: id {} used twice", at(), p.id)));
                }
                if !p.min_deg.is_finite() || !p.max_deg.is_finite() {
                    return Err(Error::InvalidParams(format!("{}: non-finite angle", at())));
                }
                if p.min_deg == p.max_deg {
                    return Err(Error::InvalidParams(format!("{}: min_deg equals max_deg", at())));
                }
                if p.min == p.max {
                    return Err(Error::InvalidParams(format!("{}: min equals max", at())));
                }
            }
        }
        Ok(())
    }
}
