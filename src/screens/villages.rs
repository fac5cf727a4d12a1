//! Village overview: bungalows grouped by village with bed-level occupancy.
//!
//! Occupancy here counts beds, not bungalows. When a period is selected, an
//! occupant whose stay dates are known and fall outside it is not counted;
//! occupants without dates always are.

use time::Date;

use crate::api::types::{BedOccupant, Bungalow, Id, Village};
use crate::api::{ApiError, Backend};
use crate::period::{DateRange, parse_date};

#[cfg(test)]
#[path = "villages_test.rs"]
mod tests;

/// One occupied bed as listed under its bungalow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OccupantRow {
    pub bed_id: String,
    pub name: String,
    pub registration_id: Option<Id>,
    pub stage_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BungalowLine<'a> {
    pub bungalow: &'a Bungalow,
    pub occupants: Vec<OccupantRow>,
}

impl BungalowLine<'_> {
    #[must_use]
    pub fn free_beds(&self) -> usize {
        self.bungalow.beds.len().saturating_sub(self.occupants.len())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VillageGroup<'a> {
    pub name: String,
    pub village: Option<&'a Village>,
    pub bungalows: Vec<BungalowLine<'a>>,
}

impl VillageGroup<'_> {
    #[must_use]
    pub fn total_beds(&self) -> usize {
        self.bungalows.iter().map(|line| line.bungalow.beds.len()).sum()
    }

    #[must_use]
    pub fn occupied_beds(&self) -> usize {
        self.bungalows.iter().map(|line| line.occupants.len()).sum()
    }

    /// Bungalows with at least one counted occupant.
    #[must_use]
    pub fn occupied_bungalows(&self) -> usize {
        self.bungalows.iter().filter(|line| !line.occupants.is_empty()).count()
    }
}

#[derive(Debug, Clone, Default)]
pub struct VillagesView {
    pub villages: Vec<Village>,
    pub bungalows: Vec<Bungalow>,
    pub period_start: Option<Date>,
    pub period_end: Option<Date>,
}

impl VillagesView {
    /// # Errors
    ///
    /// The first failing fetch.
    pub async fn load(backend: &dyn Backend) -> Result<Self, ApiError> {
        let (villages, bungalows) = tokio::try_join!(backend.list_villages(), backend.list_bungalows())?;
        Ok(Self { villages, bungalows, ..Self::default() })
    }

    pub fn set_period(&mut self, start: Option<Date>, end: Option<Date>) {
        self.period_start = start;
        self.period_end = end;
    }

    #[must_use]
    pub fn period(&self) -> Option<DateRange> {
        DateRange::from_bounds(self.period_start, self.period_end)
    }

    /// Occupied beds of `bungalow` counted for the current period.
    #[must_use]
    pub fn occupants(&self, bungalow: &Bungalow) -> Vec<OccupantRow> {
        let period = self.period();
        bungalow
            .beds
            .iter()
            .filter_map(|bed| bed.occupied_by.as_ref().map(|occupant| (bed, occupant)))
            .filter(|(_, occupant)| period.is_none_or(|period| present_during(occupant, &period)))
            .map(|(bed, occupant)| {
                let details = match occupant {
                    BedOccupant::Details(details) => Some(details),
                    _ => None,
                };
                OccupantRow {
                    bed_id: bed.id.clone(),
                    name: occupant.display_name(),
                    registration_id: details.and_then(|d| d.registration_id),
                    stage_name: details.map(|d| d.stage_name.clone()).filter(|s| !s.is_empty()),
                }
            })
            .collect()
    }

    /// Every village in name order, including villages the backend lists
    /// without bungalows and bungalow villages it does not list.
    #[must_use]
    pub fn groups(&self) -> Vec<VillageGroup<'_>> {
        let mut names: Vec<&str> = self
            .villages
            .iter()
            .map(|v| v.name.as_str())
            .chain(self.bungalows.iter().map(|b| b.village.as_str()))
            .collect();
        names.sort_unstable();
        names.dedup();

        names
            .into_iter()
            .map(|name| {
                let mut bungalows: Vec<&Bungalow> = self.bungalows.iter().filter(|b| b.village == name).collect();
                bungalows.sort_by(|a, b| a.name.cmp(&b.name));
                VillageGroup {
                    name: name.to_owned(),
                    village: self.villages.iter().find(|v| v.name == name),
                    bungalows: bungalows
                        .into_iter()
                        .map(|bungalow| BungalowLine { bungalow, occupants: self.occupants(bungalow) })
                        .collect(),
                }
            })
            .collect()
    }
}

fn present_during(occupant: &BedOccupant, period: &DateRange) -> bool {
    let BedOccupant::Details(details) = occupant else {
        return true;
    };
    match (parse_date(&details.start_date), parse_date(&details.end_date)) {
        (Ok(start), Ok(end)) => DateRange::new(start, end).overlaps(period),
        _ => true,
    }
}
