//! Breed identification result
//!
//! Opaque payload from the inference service. The orchestrator stores and
//! forwards it without interpreting any field.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BreedResult {
    /// Breed name as returned by the model
    pub name: String,
    /// Match confidence, 0-100
    pub confidence: u8,
    /// Region of origin
    pub origin: String,
    /// Typical daily milk yield, free text ("10-15 liters/day")
    pub avg_milk_yield: String,
    pub physical_traits: PhysicalTraits,
    /// Characteristic tags ("Heat Tolerant", ...)
    #[serde(default)]
    pub characteristics: Vec<String>,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct PhysicalTraits {
    pub height: String,
    pub weight: String,
    pub color: String,
    pub horns: String,
}

impl BreedResult {
    /// Structural sanity check applied to decoded service responses
    pub fn check(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("breed name is empty".to_string());
        }
        if self.confidence > 100 {
            return Err(format!("confidence {} outside 0-100", self.confidence));
        }
        Ok(())
    }

    /// Gir profile served by the simulated inference service
    pub fn gir_cattle() -> Self {
        Self {
            name: "Gir Cattle".to_string(),
            confidence: 94,
            origin: "Gujarat, India".to_string(),
            avg_milk_yield: "10-15 liters/day".to_string(),
            physical_traits: PhysicalTraits {
                height: "130-140 cm".to_string(),
                weight: "385-400 kg".to_string(),
                color: "Red to yellow with white patches".to_string(),
                horns: "Curved backward and upward".to_string(),
            },
            characteristics: [
                "Heat Tolerant",
                "Disease Resistant",
                "High Milk Fat",
                "Docile Nature",
                "Drought Resistant",
                "Long Lactation",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            description: "The Gir breed is one of the most important zebu breeds of India. \
                Known for their distinctive appearance with a curved forehead and hanging ears, \
                Gir cattle are highly valued for their milk production and adaptability to \
                harsh tropical conditions."
                .to_string(),
        }
    }
}
