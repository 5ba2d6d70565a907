//! Resource recommendation for a single sizing dimension.
//!
//! A [`GeometryModel`] owns one [`GeometryInput`], persists it through a
//! [`KeyValueStore`] under a slug derived from the title, and keeps the
//! derived [`Recommendation`] current after every mutation.

use crate::domain::model::{GeometryInput, Recommendation};
use crate::domain::ports::KeyValueStore;
use crate::utils::rounding::round_half_away;

const KEY_CURRENT: &str = "current";
const KEY_UTILIZATION: &str = "utilization";
const KEY_UTILIZATION_DESIRED: &str = "utilization_desired";
const KEY_SPREAD: &str = "spread";
const KEY_IS_OPEN: &str = "isOpen";

/// Computes the recommendation for `input`.
///
/// Returns `None` when `utilization_desired` is zero; callers keep whatever
/// recommendation they already had.
pub fn recommend(input: &GeometryInput) -> Option<Recommendation> {
    if input.utilization_desired == 0.0 {
        return None;
    }

    let recommended = (input.current * input.utilization / input.utilization_desired).ceil();

    let (min_recommended, max_recommended) = if input.spread_percent > 0.0 {
        let delta = round_half_away(recommended * input.spread_percent / 100.0, 0);
        (recommended - delta, recommended + delta)
    } else {
        (recommended, recommended)
    };

    let (min_utilization_actual, max_utilization_actual) = if input.current != 0.0 {
        (
            Some(round_half_away(min_recommended / input.current * 100.0, 0)),
            Some(round_half_away(max_recommended / input.current * 100.0, 0)),
        )
    } else {
        (None, None)
    };

    Some(Recommendation {
        recommended,
        min_recommended,
        max_recommended,
        min_utilization_actual,
        max_utilization_actual,
    })
}

/// Lowercase alphanumeric-only form of a title, used as the key prefix.
pub fn slugify(title: &str) -> String {
    title
        .chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(|c| c.to_lowercase())
        .collect()
}

pub struct GeometryModel<S: KeyValueStore> {
    input: GeometryInput,
    recommendation: Recommendation,
    slug: String,
    store: S,
}

impl<S: KeyValueStore> GeometryModel<S> {
    /// Restores persisted fields for `title` from `store`.
    pub fn load(title: &str, unit_label: &str, store: S) -> Self {
        let slug = slugify(title);
        let mut input = GeometryInput::new(title, unit_label);

        let read = |field: &str| -> Option<f64> {
            let key = format!("{}-{}", slug, field);
            let raw = store.get(&key)?;
            match raw.trim().parse::<f64>() {
                Ok(value) => Some(value),
                Err(e) => {
                    tracing::warn!("Ignoring unparsable stored value {}={:?}: {}", key, raw, e);
                    None
                }
            }
        };

        if let Some(value) = read(KEY_CURRENT) {
            input.current = value;
        }
        if let Some(value) = read(KEY_UTILIZATION) {
            input.utilization = value;
        }
        if let Some(value) = read(KEY_UTILIZATION_DESIRED) {
            input.utilization_desired = value;
        }
        if let Some(value) = read(KEY_SPREAD) {
            input.spread_percent = value;
        }
        if let Some(raw) = store.get(&format!("{}-{}", slug, KEY_IS_OPEN)) {
            input.collapsed = raw.trim() != "true";
        }

        let mut model = Self {
            input,
            recommendation: Recommendation::default(),
            slug,
            store,
        };
        model.recompute();
        model
    }

    pub fn input(&self) -> &GeometryInput {
        &self.input
    }

    pub fn recommendation(&self) -> &Recommendation {
        &self.recommendation
    }

    pub fn slug(&self) -> &str {
        &self.slug
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn set_current(&mut self, value: f64) {
        self.input.current = value;
        self.changed();
    }

    pub fn set_utilization(&mut self, value: f64) {
        self.input.utilization = value;
        self.changed();
    }

    pub fn set_utilization_desired(&mut self, value: f64) {
        self.input.utilization_desired = value;
        self.changed();
    }

    pub fn set_spread_percent(&mut self, value: f64) {
        self.input.spread_percent = value;
        self.changed();
    }

    pub fn set_collapsed(&mut self, collapsed: bool) {
        self.input.collapsed = collapsed;
        self.changed();
    }

    fn changed(&mut self) {
        self.persist();
        self.recompute();
    }

    fn recompute(&mut self) {
        match recommend(&self.input) {
            Some(recommendation) => {
                tracing::debug!(
                    "{}: recommended {} {} (range {}..={})",
                    self.input.title,
                    recommendation.recommended,
                    self.input.unit_label,
                    recommendation.min_recommended,
                    recommendation.max_recommended
                );
                self.recommendation = recommendation;
            }
            None => {
                tracing::debug!(
                    "{}: desired utilization is zero, keeping previous recommendation",
                    self.input.title
                );
            }
        }
    }

    fn persist(&mut self) {
        let fields = [
            (KEY_CURRENT, self.input.current),
            (KEY_UTILIZATION, self.input.utilization),
            (KEY_UTILIZATION_DESIRED, self.input.utilization_desired),
            (KEY_SPREAD, self.input.spread_percent),
        ];

        for (field, value) in fields {
            if value != 0.0 {
                self.write(field, &value.to_string());
            }
        }
        let is_open = (!self.input.collapsed).to_string();
        self.write(KEY_IS_OPEN, &is_open);
    }

    fn write(&mut self, field: &str, value: &str) {
        let key = format!("{}-{}", self.slug, field);
        if let Err(e) = self.store.set(&key, value) {
            tracing::warn!("Failed to persist {}: {}", key, e);
        }
    }
}
