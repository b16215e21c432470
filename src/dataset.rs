//! A dataset bundles the city/event catalogs, historical impact labels and
//! daily metric tables loaded from one directory.
use crate::city::{City, CityMap};
use crate::event::{Event, EventMap, EventType};
use crate::impact::ImpactMap;
use crate::input::{city::read_cities, event::read_events, impact::read_impacts,
    metric::read_metrics};
use crate::metric::MetricStore;
use anyhow::{Context, Result, bail};
use itertools::Itertools;
use log::info;
use std::path::Path;
use strum::IntoEnumIterator;

/// All historical data the pipeline operates on.
///
/// Loaded once and treated as read-only afterwards: the trainer, predictor,
/// analyzer and simulator all borrow the same instance.
pub struct Dataset {
    /// The city catalog, keyed by name
    pub cities: CityMap,
    /// The event catalog, keyed by name
    pub events: EventMap,
    /// Historical impact records, keyed by event name
    pub impacts: ImpactMap,
    /// Daily metric records across all domains
    pub metrics: MetricStore,
}

impl Dataset {
    /// Read a dataset from the specified directory.
    ///
    /// `cities.csv` and `events.csv` are required; the impact and metric
    /// files are optional and their absence only narrows what the pipeline
    /// can derive.
    ///
    /// # Arguments
    ///
    /// * `data_dir` - Folder containing the dataset CSV files
    pub fn from_path<P: AsRef<Path>>(data_dir: P) -> Result<Dataset> {
        let data_dir = data_dir.as_ref();
        let cities = read_cities(data_dir).context("Failed to read city catalog")?;
        let events = read_events(data_dir, &cities).context("Failed to read event catalog")?;
        let (impacts, _) = read_impacts(data_dir, &events, &cities)
            .context("Failed to read historical impacts")?;
        let (metrics, _) =
            read_metrics(data_dir, &cities).context("Failed to read metric tables")?;

        info!(
            "Dataset loaded: {} cities, {} events, {} impact records, {} daily metric records",
            cities.len(),
            events.len(),
            impacts.len(),
            metrics.len()
        );

        Ok(Dataset {
            cities,
            events,
            impacts,
            metrics,
        })
    }

    /// Look up a city by name, failing with the list of valid names
    pub fn city(&self, name: &str) -> Result<&City> {
        match self.cities.get(name) {
            Some(city) => Ok(city),
            None => bail!(
                "City '{}' not found. Available: {}",
                name,
                self.cities.keys().join(", ")
            ),
        }
    }

    /// Look up an event by name, failing with the list of valid names
    pub fn event(&self, name: &str) -> Result<&Event> {
        match self.events.get(name) {
            Some(event) => Ok(event),
            None => bail!(
                "Event '{}' not found. Available: {}",
                name,
                self.events.keys().join(", ")
            ),
        }
    }

    /// All catalog events of the given type
    pub fn events_of_type(&self, event_type: EventType) -> Vec<&Event> {
        self.events
            .values()
            .filter(|e| e.event_type == event_type)
            .collect()
    }

    /// Check that at least one catalog event has the given type, failing
    /// with the list of types that do occur
    pub fn ensure_event_type_known(&self, event_type: EventType) -> Result<()> {
        if self.events_of_type(event_type).is_empty() {
            let known: Vec<_> = EventType::iter()
                .filter(|t| !self.events_of_type(*t).is_empty())
                .map(|t| t.to_string())
                .collect();
            bail!(
                "No historical events of type '{}'. Types with data: {}",
                event_type,
                known.join(", ")
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{assert_error, dataset};
    use rstest::rstest;

    #[rstest]
    fn test_city_lookup_names_valid_set(dataset: Dataset) {
        assert!(dataset.city("Lisbon").is_ok());
        assert_error!(
            dataset.city("Atlantis"),
            "City 'Atlantis' not found. Available: Lisbon, Porto, Osaka"
        );
    }

    #[rstest]
    fn test_events_of_type(dataset: Dataset) {
        assert!(!dataset.events_of_type(EventType::Music).is_empty());
        assert!(dataset.events_of_type(EventType::Fair).is_empty());
    }

    #[rstest]
    fn test_ensure_event_type_known(dataset: Dataset) {
        assert!(dataset.ensure_event_type_known(EventType::Music).is_ok());
        assert!(dataset.ensure_event_type_known(EventType::Fair).is_err());
    }
}
