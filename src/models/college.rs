//! College model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// College type
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CollegeType {
    Technical,
    Medical,
    Arts,
    #[default]
    Other,
}

impl std::fmt::Display for CollegeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Technical => write!(f, "TECHNICAL"),
            Self::Medical => write!(f, "MEDICAL"),
            Self::Arts => write!(f, "ARTS"),
            Self::Other => write!(f, "OTHER"),
        }
    }
}

impl std::str::FromStr for CollegeType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "TECHNICAL" => Ok(Self::Technical),
            "MEDICAL" => Ok(Self::Medical),
            "ARTS" => Ok(Self::Arts),
            "OTHER" => Ok(Self::Other),
            _ => Err(anyhow::anyhow!("Invalid college type: {}", s)),
        }
    }
}

/// Kind of a college page section
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SectionType {
    About,
    Custom,
    StudentActivities,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollegeSection {
    pub id: String,
    pub section_type: SectionType,
    pub title: String,
    /// Markdown body
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub order: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GalleryImage {
    pub url: String,
    #[serde(default)]
    pub caption: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollegeLeader {
    pub name: String,
    pub title: String,
    #[serde(default)]
    pub image_url: Option<String>,
}

/// College belonging to a university
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct College {
    pub id: i64,
    pub university_id: i64,
    pub name: String,
    pub slug: String,
    #[serde(rename = "type")]
    pub college_type: CollegeType,
    #[serde(default)]
    pub sections: Vec<CollegeSection>,
    #[serde(default)]
    pub gallery_images: Vec<GalleryImage>,
    #[serde(default)]
    pub collage_leaders: Vec<CollegeLeader>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl College {
    pub fn new(university_id: i64, name: String, slug: String, college_type: CollegeType) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            university_id,
            name,
            slug,
            college_type,
            sections: Vec::new(),
            gallery_images: Vec::new(),
            collage_leaders: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Sections in display order
    pub fn ordered_sections(&self) -> Vec<&CollegeSection> {
        let mut sections: Vec<&CollegeSection> = self.sections.iter().collect();
        sections.sort_by_key(|s| s.order);
        sections
    }
}

/// Input for creating a college
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCollegeInput {
    pub name: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(rename = "type", default)]
    pub college_type: CollegeType,
    #[serde(default)]
    pub sections: Vec<CollegeSection>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_college_type_parse_and_display() {
        assert_eq!("medical".parse::<CollegeType>().unwrap(), CollegeType::Medical);
        assert_eq!(CollegeType::Technical.to_string(), "TECHNICAL");
        assert!("law".parse::<CollegeType>().is_err());
    }

    #[test]
    fn test_section_type_wire_format() {
        let json = serde_json::to_string(&SectionType::StudentActivities).unwrap();
        assert_eq!(json, "\"STUDENT_ACTIVITIES\"");
    }

    #[test]
    fn test_ordered_sections() {
        let mut college = College::new(1, "Medicine".into(), "medicine".into(), CollegeType::Medical);
        college.sections = vec![
            CollegeSection { id: "b".into(), section_type: SectionType::Custom, title: "B".into(), content: String::new(), order: 2 },
            CollegeSection { id: "a".into(), section_type: SectionType::About, title: "A".into(), content: String::new(), order: 1 },
        ];
        let ordered: Vec<&str> = college.ordered_sections().iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ordered, vec!["a", "b"]);
    }
}
