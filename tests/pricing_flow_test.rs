use chrono::NaiveDate;

use propvest_api::models::property::{PricingConfig, RentalPeriod};
use propvest_api::models::reservation::GuestCount;
use propvest_api::services::availability_service::{
    AvailabilityError, AvailabilityService, DateRange,
};
use propvest_api::services::pricing_service::{PricingError, PricingService};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn nightly_config() -> PricingConfig {
    PricingConfig {
        amount: 5000,
        currency: "USD".to_string(),
        deposit: Some(2000),
        service_charge: Some(1000),
        period: RentalPeriod::Night,
    }
}

fn couple() -> GuestCount {
    GuestCount {
        adults: 2,
        children: 0,
        infants: 0,
    }
}

#[test]
fn availability_then_quote_happy_path() {
    // The flow a booking request runs: validate the range, check it against
    // existing stays, then price it.
    let range = DateRange::new(date(2024, 3, 10), date(2024, 3, 13)).unwrap();
    let booked = vec![
        DateRange::new(date(2024, 2, 1), date(2024, 2, 5)).unwrap(),
        DateRange::new(date(2024, 3, 20), date(2024, 3, 25)).unwrap(),
    ];

    AvailabilityService::check_available(&range, &booked, date(2024, 1, 1))
        .expect("clear future range should be available");

    let breakdown = PricingService::quote(&nightly_config(), &range, &couple(), 4).unwrap();
    assert_eq!(breakdown.total_amount, 18150);
    assert_eq!(breakdown.currency, "USD");
    assert_eq!(breakdown.lines.len(), 4);
}

#[test]
fn overlapping_request_is_rejected_before_pricing() {
    let range = DateRange::new(date(2024, 3, 10), date(2024, 3, 12)).unwrap();
    let booked = vec![DateRange::new(date(2024, 3, 11), date(2024, 3, 14)).unwrap()];

    let err = AvailabilityService::check_available(&range, &booked, date(2024, 1, 1)).unwrap_err();
    assert_eq!(err, AvailabilityError::DatesUnavailable);
}

#[test]
fn zero_night_stay_never_reaches_pricing() {
    let err = DateRange::new(date(2024, 3, 10), date(2024, 3, 10)).unwrap_err();
    assert_eq!(err, AvailabilityError::EmptyRange);
}

#[test]
fn quote_totals_stay_exact_across_long_stays() {
    // Integer minor units: no drift however long the stay gets.
    let config = PricingConfig {
        amount: 3333,
        currency: "NGN".to_string(),
        deposit: None,
        service_charge: None,
        period: RentalPeriod::Night,
    };
    let range = DateRange::new(date(2024, 1, 1), date(2024, 12, 31)).unwrap();
    let nights = range.nights();
    let breakdown = PricingService::quote(&config, &range, &couple(), 4).unwrap();

    assert_eq!(breakdown.lines[0].amount, 3333 * nights);
    assert_eq!(
        breakdown.total_amount,
        3333 * nights + PricingService::platform_fee(3333 * nights)
    );
}

#[test]
fn capacity_violations_surface_as_errors() {
    let range = DateRange::new(date(2024, 3, 10), date(2024, 3, 12)).unwrap();
    let crowd = GuestCount {
        adults: 5,
        children: 1,
        infants: 0,
    };
    assert!(matches!(
        PricingService::quote(&nightly_config(), &range, &crowd, 4),
        Err(PricingError::CapacityExceeded { .. })
    ));
}

#[test]
fn blocked_dates_cover_every_day_of_each_stay() {
    let booked = vec![
        DateRange::new(date(2024, 3, 10), date(2024, 3, 12)).unwrap(),
        DateRange::new(date(2024, 3, 20), date(2024, 3, 21)).unwrap(),
    ];
    let blocked = AvailabilityService::blocked_dates(&booked);

    assert!(blocked.contains(&date(2024, 3, 10)));
    assert!(blocked.contains(&date(2024, 3, 11)));
    assert!(blocked.contains(&date(2024, 3, 12)));
    assert!(blocked.contains(&date(2024, 3, 20)));
    assert!(blocked.contains(&date(2024, 3, 21)));
    assert_eq!(blocked.len(), 5);
}
