//! Typed lookup tables keyed by the enumerated dimensions
//!
//! Parameter tables are plain structs with one named field per dimension
//! value, so a YAML parameter file reads naturally and lookups never go
//! through string labels at run time.

use serde::{Deserialize, Serialize};

use super::dimensions::{AgeBracket, Gender, SmokingIntensity, SmokingStatus};

/// A value per age bracket
pub type AgeCurve = [f64; AgeBracket::COUNT];

/// Look up an age-bracket curve
#[inline]
pub fn by_bracket(curve: &AgeCurve, bracket: AgeBracket) -> f64 {
    curve[bracket.index()]
}

/// Look up a table indexed by completed years of age.
///
/// Validation guarantees the table covers every reachable age; ages past the
/// end read the last entry.
#[inline]
pub fn by_year(table: &[f64], age_months: i64) -> f64 {
    let years = (age_months.max(0) / 12) as usize;
    match table.get(years) {
        Some(v) => *v,
        None => table.last().copied().unwrap_or(0.0),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ByGender<T> {
    pub female: T,
    pub male: T,
}

impl<T> ByGender<T> {
    pub fn new(female: T, male: T) -> Self {
        Self { female, male }
    }

    #[inline]
    pub fn get(&self, gender: Gender) -> &T {
        match gender {
            Gender::Female => &self.female,
            Gender::Male => &self.male,
        }
    }

    pub fn get_mut(&mut self, gender: Gender) -> &mut T {
        match gender {
            Gender::Female => &mut self.female,
            Gender::Male => &mut self.male,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Gender, &T)> {
        Gender::ALL.into_iter().map(move |g| (g, self.get(g)))
    }
}

impl<T: Clone> ByGender<T> {
    pub fn uniform(value: T) -> Self {
        Self {
            female: value.clone(),
            male: value,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ByStatus<T> {
    pub never: T,
    pub former: T,
    pub current: T,
}

impl<T> ByStatus<T> {
    pub fn new(never: T, former: T, current: T) -> Self {
        Self {
            never,
            former,
            current,
        }
    }

    #[inline]
    pub fn get(&self, status: SmokingStatus) -> &T {
        match status {
            SmokingStatus::Never => &self.never,
            SmokingStatus::Former => &self.former,
            SmokingStatus::Current => &self.current,
        }
    }

    pub fn get_mut(&mut self, status: SmokingStatus) -> &mut T {
        match status {
            SmokingStatus::Never => &mut self.never,
            SmokingStatus::Former => &mut self.former,
            SmokingStatus::Current => &mut self.current,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (SmokingStatus, &T)> {
        SmokingStatus::ALL.into_iter().map(move |s| (s, self.get(s)))
    }
}

impl<T: Clone> ByStatus<T> {
    pub fn uniform(value: T) -> Self {
        Self {
            never: value.clone(),
            former: value.clone(),
            current: value,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ByIntensity<T> {
    pub light: T,
    pub moderate: T,
    pub heavy: T,
}

impl<T> ByIntensity<T> {
    pub fn new(light: T, moderate: T, heavy: T) -> Self {
        Self {
            light,
            moderate,
            heavy,
        }
    }

    #[inline]
    pub fn get(&self, intensity: SmokingIntensity) -> &T {
        match intensity {
            SmokingIntensity::Light => &self.light,
            SmokingIntensity::Moderate => &self.moderate,
            SmokingIntensity::Heavy => &self.heavy,
        }
    }

    pub fn get_mut(&mut self, intensity: SmokingIntensity) -> &mut T {
        match intensity {
            SmokingIntensity::Light => &mut self.light,
            SmokingIntensity::Moderate => &mut self.moderate,
            SmokingIntensity::Heavy => &mut self.heavy,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (SmokingIntensity, &T)> {
        SmokingIntensity::ALL
            .into_iter()
            .map(move |i| (i, self.get(i)))
    }
}

impl<T: Clone> ByIntensity<T> {
    pub fn uniform(value: T) -> Self {
        Self {
            light: value.clone(),
            moderate: value.clone(),
            heavy: value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_by_year_reads_last_entry_past_end() {
        let table = vec![0.1, 0.2, 0.3];
        assert_eq!(by_year(&table, 0), 0.1);
        assert_eq!(by_year(&table, 23), 0.2);
        assert_eq!(by_year(&table, 24), 0.3);
        assert_eq!(by_year(&table, 600), 0.3);
    }

    #[test]
    fn test_named_lookups() {
        let t = ByStatus::new(1.0, 2.0, 3.0);
        assert_eq!(*t.get(SmokingStatus::Former), 2.0);
        let g = ByGender::new("f", "m");
        assert_eq!(*g.get(Gender::Male), "m");
        let i = ByIntensity::uniform(4);
        assert_eq!(i.iter().map(|(_, v)| *v).sum::<i32>(), 12);
    }
}
