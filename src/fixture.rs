//! Fixtures for tests
use crate::artifact::TrainedArtifact;
use crate::city::{City, CityMap};
use crate::comparator::{ComparatorOptions, ComparisonWindows};
use crate::dataset::Dataset;
use crate::event::{Event, EventMap, EventType};
use crate::features::assemble_training;
use crate::impact::{EventImpact, ImpactMap};
use crate::metric::{EconomicMetric, HotelMetric, MetricStore, MobilityMetric, TourismMetric};
use crate::predictor::Predictor;
use crate::trainer::{TrainerOptions, train};
use chrono::NaiveDate;
use rstest::fixture;

/// Assert that an error with the given message occurs
macro_rules! assert_error {
    ($result:expr, $msg:expr) => {
        assert_eq!(
            $result.unwrap_err().chain().next().unwrap().to_string(),
            $msg
        );
    };
}
pub(crate) use assert_error;

/// The Lisbon catalog entry used across tests
pub fn lisbon() -> City {
    City {
        name: "Lisbon".into(),
        country: "Portugal".to_string(),
        continent: "Europe".to_string(),
        population: 545_000,
        annual_tourists: 6_100_000,
        hotel_rooms: 22_000,
        avg_hotel_price_usd: 140.0,
        gdp_usd: 96_000_000_000.0,
    }
}

#[fixture]
pub fn cities() -> CityMap {
    [
        lisbon(),
        City {
            name: "Porto".into(),
            country: "Portugal".to_string(),
            continent: "Europe".to_string(),
            population: 238_000,
            annual_tourists: 2_900_000,
            hotel_rooms: 11_000,
            avg_hotel_price_usd: 110.0,
            gdp_usd: 34_000_000_000.0,
        },
        City {
            name: "Osaka".into(),
            country: "Japan".to_string(),
            continent: "Asia".to_string(),
            population: 2_750_000,
            annual_tourists: 12_000_000,
            hotel_rooms: 90_000,
            avg_hotel_price_usd: 120.0,
            gdp_usd: 180_000_000_000.0,
        },
    ]
    .into_iter()
    .map(|city| (city.name.clone(), city))
    .collect()
}

fn date(s: &str) -> NaiveDate {
    s.parse().unwrap()
}

#[fixture]
pub fn events() -> EventMap {
    [
        Event {
            name: "Atlantic Song Festival".into(),
            city: "Lisbon".into(),
            event_type: EventType::Music,
            start_date: date("2024-06-01"),
            end_date: date("2024-06-03"),
            expected_attendance: Some(120_000),
            actual_attendance: None,
            event_cost_usd: Some(20_000_000.0),
        },
        Event {
            name: "Porto Wine Fest".into(),
            city: "Porto".into(),
            event_type: EventType::Music,
            start_date: date("2024-09-05"),
            end_date: date("2024-09-08"),
            expected_attendance: Some(80_000),
            actual_attendance: None,
            event_cost_usd: None,
        },
        Event {
            name: "Harbour Marathon".into(),
            city: "Osaka".into(),
            event_type: EventType::Sports,
            start_date: date("2024-10-12"),
            end_date: date("2024-10-12"),
            expected_attendance: Some(30_000),
            actual_attendance: Some(34_000),
            event_cost_usd: Some(5_000_000.0),
        },
        // A catalog event with no impact record and no metrics
        Event {
            name: "Atlantic Business Forum".into(),
            city: "Lisbon".into(),
            event_type: EventType::Conference,
            start_date: date("2024-11-20"),
            end_date: date("2024-11-21"),
            expected_attendance: Some(5_000),
            actual_attendance: None,
            event_cost_usd: None,
        },
    ]
    .into_iter()
    .map(|event| (event.name.clone(), event))
    .collect()
}

/// A labelled impact record with the fields training needs
fn impact_row(
    event: &str,
    city: &str,
    event_type: EventType,
    attendance: f64,
    duration_days: f64,
    total_usd: f64,
) -> EventImpact {
    let mut impact = EventImpact::new(event.into(), city.into());
    impact.event_type = Some(event_type);
    impact.attendance = Some(attendance);
    impact.duration_days = Some(duration_days);
    impact.total_economic_impact_usd = Some(total_usd);
    impact
}

#[fixture]
pub fn impacts() -> ImpactMap {
    let mut rows = Vec::new();

    // The flagship event, with a complete record
    let mut atlantic = impact_row(
        "Atlantic Song Festival",
        "Lisbon",
        EventType::Music,
        120_000.0,
        3.0,
        68_000_000.0,
    );
    atlantic.baseline_daily_visitors = Some(1000.0);
    atlantic.event_daily_visitors = Some(1500.0);
    atlantic.visitor_increase_pct = Some(50.0);
    atlantic.additional_visitors = Some(1500.0);
    atlantic.baseline_occupancy_pct = Some(70.0);
    atlantic.event_occupancy_pct = Some(85.0);
    atlantic.occupancy_boost_pts = Some(15.0);
    atlantic.baseline_hotel_price_usd = Some(140.0);
    atlantic.event_hotel_price_usd = Some(190.0);
    atlantic.hotel_price_increase_pct = Some(35.7);
    atlantic.direct_spending_usd = Some(40_000_000.0);
    atlantic.indirect_spending_usd = Some(16_000_000.0);
    atlantic.induced_spending_usd = Some(12_000_000.0);
    atlantic.jobs_created = Some(1500.0);
    atlantic.event_cost_usd = Some(20_000_000.0);
    atlantic.derive_roi();
    rows.push(atlantic);

    let mut porto = impact_row(
        "Porto Wine Fest",
        "Porto",
        EventType::Music,
        80_000.0,
        4.0,
        40_000_000.0,
    );
    porto.visitor_increase_pct = Some(40.0);
    porto.occupancy_boost_pts = Some(13.0);
    porto.hotel_price_increase_pct = Some(27.0);
    rows.push(porto);

    let mut marathon = impact_row(
        "Harbour Marathon",
        "Osaka",
        EventType::Sports,
        34_000.0,
        1.0,
        12_000_000.0,
    );
    marathon.event_cost_usd = Some(5_000_000.0);
    marathon.derive_roi();
    rows.push(marathon);

    // A labelled row that cannot join the training set: no attendance
    let mut phantom = EventImpact::new("Phantom Expo".into(), "Lisbon".into());
    phantom.event_type = Some(EventType::Business);
    phantom.duration_days = Some(2.0);
    phantom.total_economic_impact_usd = Some(5_000_000.0);
    rows.push(phantom);

    // Historical events without catalog entries, carrying their own figures
    let synthetic = [
        ("Summer Beats", "Lisbon", EventType::Music, 60_000.0, 2.0),
        ("River Regatta", "Porto", EventType::Sports, 25_000.0, 2.0),
        ("Azulejo Biennale", "Lisbon", EventType::Culture, 45_000.0, 5.0),
        ("Tech Bridge Summit", "Porto", EventType::Business, 20_000.0, 3.0),
        ("Kansai Food Week", "Osaka", EventType::Festival, 90_000.0, 4.0),
        ("Bay Lights Parade", "Osaka", EventType::Culture, 150_000.0, 1.0),
        ("Fado Nights", "Lisbon", EventType::Music, 30_000.0, 3.0),
        ("Harbour Jazz", "Porto", EventType::Music, 40_000.0, 2.0),
    ];
    for (i, (name, city, event_type, attendance, duration)) in synthetic.into_iter().enumerate() {
        let total = attendance * duration * 80.0 + (i as f64) * 500_000.0;
        let mut row = impact_row(name, city, event_type, attendance, duration, total);
        row.visitor_increase_pct = Some(20.0 + 5.0 * i as f64);
        rows.push(row);
    }

    rows.into_iter()
        .map(|impact| (impact.event.clone(), impact))
        .collect()
}

/// The days of the inclusive range
fn days(start: &str, end: &str) -> impl Iterator<Item = NaiveDate> {
    let end = date(end);
    date(start).iter_days().take_while(move |d| *d <= end)
}

#[fixture]
pub fn metric_store() -> MetricStore {
    let mut store = MetricStore::new();

    // Lisbon: baseline May, event period 1-3 June (visitors 1000 -> 1500)
    for day in days("2024-05-01", "2024-05-31") {
        store.insert_tourism(TourismMetric {
            city: "Lisbon".into(),
            date: day,
            total_visitors: Some(1000.0),
            avg_spending_per_visitor_usd: Some(150.0),
            avg_stay_duration_days: Some(3.0),
        });
        store.insert_hotel(HotelMetric {
            city: "Lisbon".into(),
            date: day,
            occupancy_rate_pct: Some(70.0),
            avg_price_usd: Some(140.0),
        });
        store.insert_economic(EconomicMetric {
            city: "Lisbon".into(),
            date: day,
            total_spending_usd: Some(200_000.0),
            accommodation_spending_usd: Some(80_000.0),
            food_beverage_spending_usd: Some(60_000.0),
            retail_spending_usd: Some(40_000.0),
            temporary_jobs_created: Some(50.0),
            estimated_tax_revenue_usd: Some(20_000.0),
        });
        store.insert_mobility(MobilityMetric {
            city: "Lisbon".into(),
            date: day,
            airport_arrivals: Some(5000.0),
            international_flights: Some(40.0),
            public_transport_usage: Some(100_000.0),
            traffic_congestion_index: Some(1.2),
        });
    }
    for day in days("2024-06-01", "2024-06-03") {
        store.insert_tourism(TourismMetric {
            city: "Lisbon".into(),
            date: day,
            total_visitors: Some(1500.0),
            avg_spending_per_visitor_usd: Some(180.0),
            avg_stay_duration_days: Some(3.5),
        });
        store.insert_hotel(HotelMetric {
            city: "Lisbon".into(),
            date: day,
            occupancy_rate_pct: Some(85.0),
            avg_price_usd: Some(190.0),
        });
        store.insert_economic(EconomicMetric {
            city: "Lisbon".into(),
            date: day,
            total_spending_usd: Some(350_000.0),
            accommodation_spending_usd: Some(140_000.0),
            food_beverage_spending_usd: Some(100_000.0),
            retail_spending_usd: Some(70_000.0),
            temporary_jobs_created: Some(120.0),
            estimated_tax_revenue_usd: Some(35_000.0),
        });
        store.insert_mobility(MobilityMetric {
            city: "Lisbon".into(),
            date: day,
            airport_arrivals: Some(6500.0),
            international_flights: Some(55.0),
            public_transport_usage: Some(130_000.0),
            traffic_congestion_index: Some(1.5),
        });
    }

    // Porto: baseline August, event period 5-8 September
    for day in days("2024-08-06", "2024-09-04") {
        store.insert_tourism(TourismMetric {
            city: "Porto".into(),
            date: day,
            total_visitors: Some(800.0),
            avg_spending_per_visitor_usd: Some(120.0),
            avg_stay_duration_days: Some(2.5),
        });
        store.insert_hotel(HotelMetric {
            city: "Porto".into(),
            date: day,
            occupancy_rate_pct: Some(65.0),
            avg_price_usd: Some(110.0),
        });
        store.insert_economic(EconomicMetric {
            city: "Porto".into(),
            date: day,
            total_spending_usd: Some(150_000.0),
            accommodation_spending_usd: Some(60_000.0),
            food_beverage_spending_usd: Some(45_000.0),
            retail_spending_usd: Some(30_000.0),
            temporary_jobs_created: Some(30.0),
            estimated_tax_revenue_usd: Some(15_000.0),
        });
        store.insert_mobility(MobilityMetric {
            city: "Porto".into(),
            date: day,
            airport_arrivals: Some(3000.0),
            international_flights: Some(25.0),
            public_transport_usage: Some(60_000.0),
            traffic_congestion_index: Some(1.0),
        });
    }
    for day in days("2024-09-05", "2024-09-08") {
        store.insert_tourism(TourismMetric {
            city: "Porto".into(),
            date: day,
            total_visitors: Some(1120.0),
            avg_spending_per_visitor_usd: Some(140.0),
            avg_stay_duration_days: Some(3.0),
        });
        store.insert_hotel(HotelMetric {
            city: "Porto".into(),
            date: day,
            occupancy_rate_pct: Some(78.0),
            avg_price_usd: Some(140.0),
        });
        store.insert_economic(EconomicMetric {
            city: "Porto".into(),
            date: day,
            total_spending_usd: Some(240_000.0),
            accommodation_spending_usd: Some(95_000.0),
            food_beverage_spending_usd: Some(75_000.0),
            retail_spending_usd: Some(48_000.0),
            temporary_jobs_created: Some(70.0),
            estimated_tax_revenue_usd: Some(24_000.0),
        });
        store.insert_mobility(MobilityMetric {
            city: "Porto".into(),
            date: day,
            airport_arrivals: Some(3600.0),
            international_flights: Some(32.0),
            public_transport_usage: Some(78_000.0),
            traffic_congestion_index: Some(1.3),
        });
    }

    // Osaka: tourism, hotel and economic data only (no mobility records)
    for day in days("2024-09-12", "2024-10-11") {
        store.insert_tourism(TourismMetric {
            city: "Osaka".into(),
            date: day,
            total_visitors: Some(9000.0),
            avg_spending_per_visitor_usd: Some(160.0),
            avg_stay_duration_days: Some(2.0),
        });
        store.insert_hotel(HotelMetric {
            city: "Osaka".into(),
            date: day,
            occupancy_rate_pct: Some(75.0),
            avg_price_usd: Some(120.0),
        });
        store.insert_economic(EconomicMetric {
            city: "Osaka".into(),
            date: day,
            total_spending_usd: Some(1_000_000.0),
            accommodation_spending_usd: Some(400_000.0),
            food_beverage_spending_usd: Some(300_000.0),
            retail_spending_usd: Some(200_000.0),
            temporary_jobs_created: Some(200.0),
            estimated_tax_revenue_usd: Some(100_000.0),
        });
    }
    for day in days("2024-10-12", "2024-10-12") {
        store.insert_tourism(TourismMetric {
            city: "Osaka".into(),
            date: day,
            total_visitors: Some(12_000.0),
            avg_spending_per_visitor_usd: Some(190.0),
            avg_stay_duration_days: Some(2.5),
        });
        store.insert_hotel(HotelMetric {
            city: "Osaka".into(),
            date: day,
            occupancy_rate_pct: Some(88.0),
            avg_price_usd: Some(160.0),
        });
        store.insert_economic(EconomicMetric {
            city: "Osaka".into(),
            date: day,
            total_spending_usd: Some(1_600_000.0),
            accommodation_spending_usd: Some(650_000.0),
            food_beverage_spending_usd: Some(480_000.0),
            retail_spending_usd: Some(320_000.0),
            temporary_jobs_created: Some(350.0),
            estimated_tax_revenue_usd: Some(160_000.0),
        });
    }

    store
}

#[fixture]
pub fn dataset(
    cities: CityMap,
    events: EventMap,
    impacts: ImpactMap,
    metric_store: MetricStore,
) -> Dataset {
    Dataset {
        cities,
        events,
        impacts,
        metrics: metric_store,
    }
}

#[fixture]
pub fn event_windows(events: EventMap) -> ComparisonWindows {
    ComparisonWindows::for_event(
        events.get("Atlantic Song Festival").unwrap(),
        &ComparatorOptions::default(),
    )
}

#[fixture]
pub fn trained(dataset: Dataset) -> (TrainedArtifact, Dataset) {
    let (table, encoder) = assemble_training(&dataset, &ComparatorOptions::default()).unwrap();
    let (artifact, _) = train(&table, encoder, &TrainerOptions::default()).unwrap();
    (artifact, dataset)
}

#[fixture]
pub fn predictor(trained: (TrainedArtifact, Dataset)) -> Predictor {
    let (artifact, dataset) = trained;
    Predictor::new(artifact, dataset)
}
