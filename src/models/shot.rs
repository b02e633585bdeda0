//! Rule-based shot assessment.
//!
//! Maps what the hunter saw at the shot site (blood colour, amount, the
//! animal's reaction) to a likely hit zone, a waiting time before the
//! follow-up search, and whether a tracking dog is needed. The rules are a
//! fixed decision table; the first matching row wins.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Observations recorded at the shot site. Field names follow the web client.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShotObservation {
    #[serde(default)]
    pub distance: Option<f64>,
    #[serde(default)]
    pub direction: Option<String>,
    #[serde(default)]
    pub wild_reaction: Option<String>,
    #[serde(default)]
    pub blood_color: Option<String>,
    #[serde(default)]
    pub blood_amount: Option<String>,
    #[serde(default)]
    pub blood_distribution: Option<String>,
    #[serde(default)]
    pub blood_height: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HitZone {
    Blattschuss,
    Lebertreffer,
    Pansenschuss,
    Keulenschuss,
}

impl fmt::Display for HitZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HitZone::Blattschuss => write!(f, "Blattschuss"),
            HitZone::Lebertreffer => write!(f, "Lebertreffer"),
            HitZone::Pansenschuss => write!(f, "Pansenschuss"),
            HitZone::Keulenschuss => write!(f, "Keulenschuss"),
        }
    }
}

/// Blood-tracking dog recommended for the follow-up search.
pub const TRACKING_DOG: &str = "Schweißhund";

/// Result of [`analyze`]. Wait times are in minutes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShotAssessment {
    pub hit_zone: HitZone,
    pub confidence: f64,
    pub wait_time_min: u32,
    pub wait_time_optimal: u32,
    pub wait_time_max: u32,
    pub dog_required: bool,
    pub dog_type: Option<String>,
    pub success_probability: f64,
}

impl ShotAssessment {
    fn new(hit_zone: HitZone, confidence: f64, waits: (u32, u32, u32), dog: bool) -> Self {
        Self {
            hit_zone,
            confidence,
            wait_time_min: waits.0,
            wait_time_optimal: waits.1,
            wait_time_max: waits.2,
            dog_required: dog,
            dog_type: dog.then(|| TRACKING_DOG.to_string()),
            success_probability: confidence,
        }
    }
}

impl fmt::Display for ShotAssessment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Hit zone:    {}", self.hit_zone)?;
        writeln!(f, "Confidence:  {:.0}%", self.confidence * 100.0)?;
        writeln!(
            f,
            "Wait time:   {} min (range {}-{} min)",
            self.wait_time_optimal, self.wait_time_min, self.wait_time_max
        )?;
        match &self.dog_type {
            Some(dog) if self.dog_required => write!(f, "Dog:         required ({})", dog),
            _ => write!(f, "Dog:         not required"),
        }
    }
}

/// Classifies a shot from the site observations.
pub fn analyze(observation: &ShotObservation) -> ShotAssessment {
    let color = observation.blood_color.as_deref();
    let amount = observation.blood_amount.as_deref();
    let reaction = observation.wild_reaction.as_deref();

    if color == Some("hell-rot") && amount == Some("viel") {
        ShotAssessment::new(HitZone::Blattschuss, 0.95, (15, 30, 60), false)
    } else if color == Some("dunkel-rot") && reaction == Some("zusammengebrochen") {
        ShotAssessment::new(HitZone::Lebertreffer, 0.88, (60, 120, 180), true)
    } else if color == Some("wässrig") || amount == Some("wenig") {
        ShotAssessment::new(HitZone::Pansenschuss, 0.72, (360, 480, 720), true)
    } else {
        ShotAssessment::new(HitZone::Keulenschuss, 0.82, (120, 180, 240), true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn observe(color: &str, amount: &str, reaction: &str) -> ShotObservation {
        ShotObservation {
            blood_color: Some(color.to_string()),
            blood_amount: Some(amount.to_string()),
            wild_reaction: Some(reaction.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_bright_red_plenty_is_shoulder_shot() {
        let result = analyze(&observe("hell-rot", "viel", "zusammengebrochen"));
        assert_eq!(result.hit_zone, HitZone::Blattschuss);
        assert_eq!(result.confidence, 0.95);
        assert!(!result.dog_required);
        assert_eq!(result.dog_type, None);
        assert_eq!(
            (result.wait_time_min, result.wait_time_optimal, result.wait_time_max),
            (15, 30, 60)
        );
    }

    #[test]
    fn test_dark_red_collapsed_is_liver_hit() {
        let result = analyze(&observe("dunkel-rot", "mittel", "zusammengebrochen"));
        assert_eq!(result.hit_zone, HitZone::Lebertreffer);
        assert_eq!(result.confidence, 0.88);
        assert_eq!(result.dog_type.as_deref(), Some(TRACKING_DOG));
        assert_eq!(result.wait_time_optimal, 120);
    }

    #[test]
    fn test_watery_or_little_blood_is_paunch_shot() {
        let watery = analyze(&observe("wässrig", "viel", "flüchtig"));
        assert_eq!(watery.hit_zone, HitZone::Pansenschuss);
        assert_eq!(watery.wait_time_max, 720);

        let little = analyze(&observe("hell-rot", "wenig", "flüchtig"));
        assert_eq!(little.hit_zone, HitZone::Pansenschuss);
        assert_eq!(little.confidence, 0.72);
    }

    #[test]
    fn test_first_matching_rule_wins() {
        // dark red + little blood + collapsed matches both the liver and the
        // paunch rule; the liver rule comes first
        let result = analyze(&observe("dunkel-rot", "wenig", "zusammengebrochen"));
        assert_eq!(result.hit_zone, HitZone::Lebertreffer);
    }

    #[test]
    fn test_fallback_is_haunch_shot() {
        let result = analyze(&ShotObservation::default());
        assert_eq!(result.hit_zone, HitZone::Keulenschuss);
        assert_eq!(result.confidence, 0.82);
        assert!(result.dog_required);
        assert_eq!(result.success_probability, result.confidence);
    }

    #[test]
    fn test_observation_reads_camel_case() {
        let observation: ShotObservation = serde_json::from_value(json!({
            "bloodColor": "hell-rot",
            "bloodAmount": "viel",
            "wildReaction": "zusammengebrochen",
            "distance": 80
        }))
        .unwrap();
        assert_eq!(observation.blood_color.as_deref(), Some("hell-rot"));
        assert_eq!(observation.distance, Some(80.0));
    }

    #[test]
    fn test_assessment_wire_shape() {
        let value = serde_json::to_value(analyze(&observe("hell-rot", "viel", "x"))).unwrap();
        assert_eq!(value["hitZone"], "Blattschuss");
        assert_eq!(value["dogRequired"], false);
        assert_eq!(value["dogType"], serde_json::Value::Null);
        assert_eq!(value["waitTimeOptimal"], 30);
        assert_eq!(value["successProbability"], 0.95);
    }
}
