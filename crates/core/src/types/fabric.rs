//! Fabric catalog records.
//!
//! A [`Fabric`] is a selectable upholstery material. Records are created by
//! the storage sync (one per base image in the fabric bucket) or by an admin,
//! and are stored as camelCase JSON documents.

use chrono::{DateTime, Utc};
use feruca::{Collator, Tailoring};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

use super::id::FabricId;

/// Colour used when a fabric has no explicit swatch colour.
pub const DEFAULT_COLOR: &str = "#E8DCC6";

/// Root-locale collator with non-ignorable punctuation.
fn name_collator() -> Collator {
    Collator::new(Tailoring::default(), false, true)
}

/// Sort order for fabrics created through the API without an explicit order.
pub const DEFAULT_ORDER: i32 = 999;

/// Category of fabrics imported from the storage bucket. Everything else is
/// considered a legacy default and is removed by the cleanup operation.
pub const SUNPROOF_CATEGORY: &str = "sunproof";

/// A fabric in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fabric {
    pub id: FabricId,
    pub name: String,
    pub category: String,
    /// Hex colour (`#RRGGBB`) used for swatches and as the base colour in the viewer.
    pub color: String,
    #[serde(default)]
    pub texture_pattern: Option<String>,
    #[serde(default)]
    pub texture_url: Option<String>,
    #[serde(default)]
    pub normal_map_url: Option<String>,
    #[serde(default)]
    pub roughness_map_url: Option<String>,
    #[serde(default)]
    pub ao_map_url: Option<String>,
    #[serde(default)]
    pub displacement_map_url: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub price_per_meter: Decimal,
    #[serde(default)]
    pub composition: String,
    #[serde(default)]
    pub water_resistant: bool,
    #[serde(default)]
    pub uv_resistant: bool,
    pub active: bool,
    pub order: i32,
    #[serde(default)]
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Fabric {
    /// Sort into catalog order: ascending `order`, then by name.
    ///
    /// Names use the CLDR root collation (accents and case are secondary and
    /// tertiary differences, lowercase first), with a byte comparison as the
    /// final tiebreak so the order is total.
    pub fn sort_catalog(fabrics: &mut [Self]) {
        let mut collator = name_collator();
        fabrics.sort_by(|a, b| {
            a.order
                .cmp(&b.order)
                .then_with(|| collator.collate(a.name.as_str(), b.name.as_str()))
        });
    }

    /// Apply a partial update. The ID never changes.
    pub fn apply(&mut self, patch: FabricPatch, now: DateTime<Utc>) {
        let FabricPatch {
            name,
            category,
            color,
            texture_pattern,
            texture_url,
            normal_map_url,
            roughness_map_url,
            ao_map_url,
            displacement_map_url,
            description,
            price_per_meter,
            composition,
            water_resistant,
            uv_resistant,
            active,
            order,
            tags,
        } = patch;

        if let Some(name) = name {
            self.name = name;
        }
        if let Some(category) = category {
            self.category = category;
        }
        if let Some(color) = color {
            self.color = color;
        }
        for (slot, value) in [
            (&mut self.texture_pattern, texture_pattern),
            (&mut self.texture_url, texture_url),
            (&mut self.normal_map_url, normal_map_url),
            (&mut self.roughness_map_url, roughness_map_url),
            (&mut self.ao_map_url, ao_map_url),
            (&mut self.displacement_map_url, displacement_map_url),
        ] {
            if let Some(value) = value {
                *slot = value;
            }
        }
        if let Some(description) = description {
            self.description = description;
        }
        if let Some(price) = price_per_meter {
            self.price_per_meter = price;
        }
        if let Some(composition) = composition {
            self.composition = composition;
        }
        if let Some(flag) = water_resistant {
            self.water_resistant = flag;
        }
        if let Some(flag) = uv_resistant {
            self.uv_resistant = flag;
        }
        if let Some(active) = active {
            self.active = active;
        }
        if let Some(order) = order {
            self.order = order;
        }
        if let Some(tags) = tags {
            self.tags = dedup_tags(tags);
        }
        self.updated_at = now;
    }
}

/// Remove duplicate tags, keeping the first occurrence of each.
#[must_use]
pub fn dedup_tags(tags: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        if !out.contains(&tag) {
            out.push(tag);
        }
    }
    out
}

// =============================================================================
// Create / Update payloads
// =============================================================================

/// Error returned when a create payload lacks an id, name or category.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Missing required fields: id, name, category")]
pub struct MissingFieldsError;

/// Body of a fabric create request.
///
/// Only `id`, `name` and `category` are required; they are optional here so
/// that a missing field is reported as a validation error rather than a
/// deserialization failure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewFabric {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub texture_pattern: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub texture_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(
        default,
        with = "rust_decimal::serde::float_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub price_per_meter: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub composition: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub water_resistant: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uv_resistant: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

impl NewFabric {
    /// Convenience constructor with the three required fields.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        category: impl Into<String>,
    ) -> Self {
        Self {
            id: Some(id.into()),
            name: Some(name.into()),
            category: Some(category.into()),
            ..Self::default()
        }
    }

    /// Build a full record, applying defaults for everything not supplied.
    ///
    /// # Errors
    ///
    /// Returns [`MissingFieldsError`] if `id`, `name` or `category` is
    /// missing or empty.
    pub fn into_fabric(self, now: DateTime<Utc>) -> Result<Fabric, MissingFieldsError> {
        let required = |value: Option<String>| value.filter(|v| !v.is_empty());
        let (Some(id), Some(name), Some(category)) = (
            required(self.id),
            required(self.name),
            required(self.category),
        ) else {
            return Err(MissingFieldsError);
        };

        Ok(Fabric {
            id: FabricId::new(id),
            name,
            category,
            color: self
                .color
                .filter(|c| !c.is_empty())
                .unwrap_or_else(|| DEFAULT_COLOR.to_string()),
            texture_pattern: self.texture_pattern,
            texture_url: self.texture_url,
            normal_map_url: None,
            roughness_map_url: None,
            ao_map_url: None,
            displacement_map_url: None,
            description: self.description.unwrap_or_default(),
            price_per_meter: self.price_per_meter.unwrap_or_default(),
            composition: self.composition.unwrap_or_default(),
            water_resistant: self.water_resistant.unwrap_or(false),
            uv_resistant: self.uv_resistant.unwrap_or(false),
            active: self.active.unwrap_or(true),
            order: self.order.unwrap_or(DEFAULT_ORDER),
            tags: dedup_tags(self.tags.unwrap_or_default()),
            created_at: now,
            updated_at: now,
        })
    }
}

/// Body of a fabric update request. Absent fields are left untouched.
///
/// The nullable URL fields distinguish an absent key (keep the stored value)
/// from an explicit `null` (clear it).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FabricPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(
        default,
        deserialize_with = "nullable",
        skip_serializing_if = "Option::is_none"
    )]
    pub texture_pattern: Option<Option<String>>,
    #[serde(
        default,
        deserialize_with = "nullable",
        skip_serializing_if = "Option::is_none"
    )]
    pub texture_url: Option<Option<String>>,
    #[serde(
        default,
        deserialize_with = "nullable",
        skip_serializing_if = "Option::is_none"
    )]
    pub normal_map_url: Option<Option<String>>,
    #[serde(
        default,
        deserialize_with = "nullable",
        skip_serializing_if = "Option::is_none"
    )]
    pub roughness_map_url: Option<Option<String>>,
    #[serde(
        default,
        deserialize_with = "nullable",
        skip_serializing_if = "Option::is_none"
    )]
    pub ao_map_url: Option<Option<String>>,
    #[serde(
        default,
        deserialize_with = "nullable",
        skip_serializing_if = "Option::is_none"
    )]
    pub displacement_map_url: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(
        default,
        with = "rust_decimal::serde::float_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub price_per_meter: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub composition: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub water_resistant: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uv_resistant: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

/// Present-but-null becomes `Some(None)`; an absent key stays `None` via `default`.
fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

// =============================================================================
// Filters and categories
// =============================================================================

/// Equality filters for listing fabrics. `None` means "do not filter".
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FabricFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
}

impl FabricFilter {
    /// Only active fabrics, any category.
    #[must_use]
    pub const fn active_only() -> Self {
        Self {
            category: None,
            active: Some(true),
        }
    }

    /// Build a filter from raw query-string values.
    ///
    /// An empty category is ignored. `active` is `true` only for the exact
    /// string `"true"`; any other present value filters for inactive fabrics.
    #[must_use]
    pub fn from_query(category: Option<&str>, active: Option<&str>) -> Self {
        Self {
            category: category.filter(|c| !c.is_empty()).map(str::to_owned),
            active: active.map(|a| a == "true"),
        }
    }

    /// Whether a fabric satisfies every supplied filter.
    #[must_use]
    pub fn matches(&self, fabric: &Fabric) -> bool {
        self.category
            .as_deref()
            .is_none_or(|category| fabric.category == category)
            && self.active.is_none_or(|active| fabric.active == active)
    }
}

/// A fabric category with the number of active fabrics in it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FabricCategory {
    pub name: String,
    pub count: usize,
    pub display_name: String,
}

impl FabricCategory {
    /// Derive the category list from a full set of fabrics, sorted by name.
    #[must_use]
    pub fn summarize(fabrics: &[Fabric]) -> Vec<Self> {
        let mut names: Vec<&str> = fabrics.iter().map(|f| f.category.as_str()).collect();
        names.sort_unstable();
        names.dedup();

        names
            .into_iter()
            .map(|name| Self {
                name: name.to_owned(),
                count: fabrics
                    .iter()
                    .filter(|f| f.active && f.category == name)
                    .count(),
                display_name: category_display_name(name).to_owned(),
            })
            .collect()
    }
}

/// Human-readable label for the known categories; unknown ones are shown as-is.
#[must_use]
pub fn category_display_name(category: &str) -> &str {
    match category {
        "outdoor" => "Outdoor",
        "indoor" => "Indoor",
        "premium" => "Premium",
        "sunproof" => "Sunproof",
        other => other,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn fabric(id: &str, name: &str, category: &str, order: i32, active: bool) -> Fabric {
        let mut f = NewFabric::new(id, name, category)
            .into_fabric(Utc::now())
            .unwrap();
        f.order = order;
        f.active = active;
        f
    }

    #[test]
    fn test_new_fabric_defaults() {
        let now = Utc::now();
        let f = NewFabric::new("linen", "Linen", "indoor")
            .into_fabric(now)
            .unwrap();
        assert_eq!(f.color, DEFAULT_COLOR);
        assert_eq!(f.order, DEFAULT_ORDER);
        assert_eq!(f.price_per_meter, Decimal::ZERO);
        assert!(f.active);
        assert!(!f.water_resistant);
        assert!(!f.uv_resistant);
        assert!(f.tags.is_empty());
        assert_eq!(f.created_at, now);
        assert_eq!(f.updated_at, now);
    }

    #[test]
    fn test_new_fabric_requires_fields() {
        let missing_name = NewFabric {
            id: Some("x".into()),
            category: Some("outdoor".into()),
            ..NewFabric::default()
        };
        assert_eq!(missing_name.into_fabric(Utc::now()), Err(MissingFieldsError));

        let empty_id = NewFabric::new("", "Name", "outdoor");
        assert_eq!(empty_id.into_fabric(Utc::now()), Err(MissingFieldsError));
    }

    #[test]
    fn test_explicit_inactive_is_kept() {
        let body: NewFabric =
            serde_json::from_str(r#"{"id":"a","name":"A","category":"c","active":false}"#)
                .unwrap();
        assert!(!body.into_fabric(Utc::now()).unwrap().active);
    }

    #[test]
    fn test_patch_distinguishes_null_from_absent() {
        let mut f = fabric("a", "A", "sunproof", 1, true);
        f.texture_url = Some("https://cdn/a.png".into());
        f.normal_map_url = Some("https://cdn/a_normal.png".into());

        let patch: FabricPatch =
            serde_json::from_str(r#"{"normalMapUrl":null,"pricePerMeter":52.5}"#).unwrap();
        f.apply(patch, Utc::now());

        assert_eq!(f.texture_url.as_deref(), Some("https://cdn/a.png"));
        assert_eq!(f.normal_map_url, None);
        assert_eq!(f.price_per_meter, Decimal::new(525, 1));
    }

    #[test]
    fn test_patch_keeps_id_and_dedups_tags() {
        let mut f = fabric("a", "A", "sunproof", 1, true);
        let patch = FabricPatch {
            name: Some("Renamed".into()),
            tags: Some(vec!["outdoor".into(), "premium".into(), "outdoor".into()]),
            ..FabricPatch::default()
        };
        f.apply(patch, Utc::now());
        assert_eq!(f.id.as_str(), "a");
        assert_eq!(f.name, "Renamed");
        assert_eq!(f.tags, vec!["outdoor".to_string(), "premium".to_string()]);
    }

    #[test]
    fn test_filter_from_query() {
        let f = FabricFilter::from_query(Some(""), Some("true"));
        assert_eq!(f.category, None);
        assert_eq!(f.active, Some(true));

        // Anything other than "true" means inactive.
        let f = FabricFilter::from_query(Some("outdoor"), Some("1"));
        assert_eq!(f.category.as_deref(), Some("outdoor"));
        assert_eq!(f.active, Some(false));

        assert_eq!(FabricFilter::from_query(None, None), FabricFilter::default());
    }

    #[test]
    fn test_filter_matches_every_supplied_field() {
        let f = fabric("a", "A", "outdoor", 1, false);
        assert!(FabricFilter::default().matches(&f));
        assert!(FabricFilter::from_query(Some("outdoor"), None).matches(&f));
        assert!(!FabricFilter::from_query(Some("outdoor"), Some("true")).matches(&f));
        assert!(!FabricFilter::from_query(Some("indoor"), Some("false")).matches(&f));
    }

    #[test]
    fn test_catalog_order() {
        let mut fabrics = vec![
            fabric("c", "beige", "sunproof", 2, true),
            fabric("b", "Zand", "sunproof", 1, true),
            fabric("a", "Antraciet", "sunproof", 1, true),
            fabric("d", "Azuur", "sunproof", 2, true),
        ];
        Fabric::sort_catalog(&mut fabrics);
        let names: Vec<_> = fabrics.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["Antraciet", "Zand", "Azuur", "beige"]);
    }

    #[test]
    fn test_catalog_order_collates_accents_and_case() {
        let mut fabrics = vec![
            fabric("linnen", "Linnen", "sunproof", 1, true),
            fabric("ecru", "Écru", "sunproof", 1, true),
            fabric("lower", "a", "sunproof", 1, true),
            fabric("upper", "A", "sunproof", 1, true),
        ];
        Fabric::sort_catalog(&mut fabrics);
        let names: Vec<_> = fabrics.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["a", "A", "Écru", "Linnen"]);
    }

    #[test]
    fn test_category_summary() {
        let fabrics = vec![
            fabric("a", "A", "sunproof", 1, true),
            fabric("b", "B", "sunproof", 2, false),
            fabric("c", "C", "outdoor", 3, true),
            fabric("d", "D", "linnen", 4, true),
        ];
        let categories = FabricCategory::summarize(&fabrics);
        let summary: Vec<_> = categories
            .iter()
            .map(|c| (c.name.as_str(), c.count, c.display_name.as_str()))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("linnen", 1, "linnen"),
                ("outdoor", 1, "Outdoor"),
                ("sunproof", 1, "Sunproof"),
            ]
        );
    }

    #[test]
    fn test_legacy_record_without_map_urls_deserializes() {
        let json = r##"{
            "id": "sunproof-ocean",
            "name": "Ocean",
            "category": "sunproof",
            "color": "#E8DCC6",
            "texturePattern": null,
            "textureUrl": "https://cdn/ocean.png",
            "description": "",
            "pricePerMeter": 45,
            "composition": "100% Solution Dyed Acrylic",
            "waterResistant": true,
            "uvResistant": true,
            "active": true,
            "order": 100,
            "tags": ["sunproof"],
            "createdAt": "2025-05-01T10:00:00.000Z",
            "updatedAt": "2025-05-01T10:00:00.000Z"
        }"##;
        let f: Fabric = serde_json::from_str(json).unwrap();
        assert_eq!(f.normal_map_url, None);
        assert_eq!(f.price_per_meter, Decimal::from(45));
    }
}
