use crate::models::property::{PricingConfig, RentalPeriod};
use crate::models::reservation::{GuestCount, PriceLine};
use crate::services::availability_service::DateRange;
use serde::Serialize;

/// Platform fee in basis points, charged on the accommodation subtotal only.
pub const PLATFORM_FEE_BPS: i64 = 100;

/// A monthly rate bills per started 30-day block.
const MONTH_BLOCK_DAYS: i64 = 30;

#[derive(Debug, Clone, PartialEq)]
pub enum PricingError {
    NonPositiveRate(i64),
    NoAdults,
    CapacityExceeded { capacity: u32, requested: u32 },
    CurrencyMismatch { expected: String, found: String },
}

impl std::fmt::Display for PricingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PricingError::NonPositiveRate(rate) => {
                write!(f, "Listing rate must be positive, got {}", rate)
            }
            PricingError::NoAdults => write!(f, "At least one adult is required"),
            PricingError::CapacityExceeded {
                capacity,
                requested,
            } => write!(
                f,
                "Property sleeps {} guests, {} requested",
                capacity, requested
            ),
            PricingError::CurrencyMismatch { expected, found } => {
                write!(f, "Expected currency {}, got {}", expected, found)
            }
        }
    }
}

impl std::error::Error for PricingError {}

#[derive(Debug, Clone, Serialize)]
pub struct PriceBreakdown {
    pub lines: Vec<PriceLine>,
    pub total_amount: i64,
    pub currency: String,
}

pub struct PricingService;

impl PricingService {
    /// Itemized cost of a stay. Deterministic, integer minor units
    /// throughout; the caller has already validated the date range.
    pub fn quote(
        config: &PricingConfig,
        range: &DateRange,
        guests: &GuestCount,
        max_guests: u32,
    ) -> Result<PriceBreakdown, PricingError> {
        if config.amount <= 0 {
            return Err(PricingError::NonPositiveRate(config.amount));
        }
        if guests.adults == 0 {
            return Err(PricingError::NoAdults);
        }
        // Infants are not counted against capacity.
        let counted = guests.adults + guests.children;
        if counted > max_guests {
            return Err(PricingError::CapacityExceeded {
                capacity: max_guests,
                requested: counted,
            });
        }

        let periods = Self::billable_periods(config.period, range);
        let subtotal = periods * config.amount;

        let unit = match config.period {
            RentalPeriod::Night => {
                if periods == 1 {
                    "night"
                } else {
                    "nights"
                }
            }
            RentalPeriod::Month => {
                if periods == 1 {
                    "month"
                } else {
                    "months"
                }
            }
        };

        let mut lines = vec![PriceLine {
            description: format!("Accommodation ({} {})", periods, unit),
            amount: subtotal,
        }];

        if let Some(deposit) = config.deposit {
            lines.push(PriceLine {
                description: "Refundable deposit".to_string(),
                amount: deposit,
            });
        }
        if let Some(service_charge) = config.service_charge {
            lines.push(PriceLine {
                description: "Service charge".to_string(),
                amount: service_charge,
            });
        }

        lines.push(PriceLine {
            description: "Platform fee".to_string(),
            amount: Self::platform_fee(subtotal),
        });

        let total_amount = lines.iter().map(|line| line.amount).sum();

        Ok(PriceBreakdown {
            lines,
            total_amount,
            currency: config.currency.clone(),
        })
    }

    /// Fee on the accommodation subtotal only; deposits and fixed charges
    /// are excluded from the fee base.
    pub fn platform_fee(subtotal: i64) -> i64 {
        subtotal * PLATFORM_FEE_BPS / 10_000
    }

    pub fn billable_periods(period: RentalPeriod, range: &DateRange) -> i64 {
        let nights = range.nights();
        match period {
            RentalPeriod::Night => nights,
            RentalPeriod::Month => (nights + MONTH_BLOCK_DAYS - 1) / MONTH_BLOCK_DAYS,
        }
    }

    /// The charge currency comes from the listing; anything else in the
    /// request is a hard error, never a silent coercion.
    pub fn ensure_currency(config: &PricingConfig, expected: &str) -> Result<(), PricingError> {
        if config.currency.eq_ignore_ascii_case(expected) {
            Ok(())
        } else {
            Err(PricingError::CurrencyMismatch {
                expected: expected.to_uppercase(),
                found: config.currency.clone(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn range(nights: u64) -> DateRange {
        let from = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap();
        let to = from.checked_add_days(chrono::Days::new(nights)).unwrap();
        DateRange::new(from, to).unwrap()
    }

    fn guests() -> GuestCount {
        GuestCount {
            adults: 2,
            children: 0,
            infants: 0,
        }
    }

    fn config(amount: i64) -> PricingConfig {
        PricingConfig {
            amount,
            currency: "USD".to_string(),
            deposit: None,
            service_charge: None,
            period: RentalPeriod::Night,
        }
    }

    #[test]
    fn accommodation_is_exact_integer_multiple() {
        for nights in 1..=30 {
            let breakdown =
                PricingService::quote(&config(5000), &range(nights), &guests(), 4).unwrap();
            assert_eq!(breakdown.lines[0].amount, 5000 * nights as i64);
        }
    }

    #[test]
    fn worked_example_totals() {
        // rate 5000 x 3 nights, deposit 2000, service charge 1000
        let config = PricingConfig {
            amount: 5000,
            currency: "USD".to_string(),
            deposit: Some(2000),
            service_charge: Some(1000),
            period: RentalPeriod::Night,
        };
        let breakdown = PricingService::quote(&config, &range(3), &guests(), 4).unwrap();

        assert_eq!(breakdown.lines[0].amount, 15000);
        assert_eq!(breakdown.lines[1].amount, 2000);
        assert_eq!(breakdown.lines[2].amount, 1000);
        assert_eq!(breakdown.lines[3].amount, 150); // 1% of accommodation only
        assert_eq!(breakdown.total_amount, 18150);
        assert_eq!(breakdown.currency, "USD");
    }

    #[test]
    fn total_is_sum_of_lines() {
        let config = PricingConfig {
            amount: 7300,
            currency: "NGN".to_string(),
            deposit: Some(12000),
            service_charge: None,
            period: RentalPeriod::Night,
        };
        let breakdown = PricingService::quote(&config, &range(11), &guests(), 6).unwrap();
        let sum: i64 = breakdown.lines.iter().map(|l| l.amount).sum();
        assert_eq!(breakdown.total_amount, sum);
    }

    #[test]
    fn fee_excludes_deposit_and_service_charge() {
        let config = PricingConfig {
            amount: 10000,
            currency: "USD".to_string(),
            deposit: Some(50000),
            service_charge: Some(50000),
            period: RentalPeriod::Night,
        };
        let breakdown = PricingService::quote(&config, &range(1), &guests(), 4).unwrap();
        let fee = breakdown
            .lines
            .iter()
            .find(|l| l.description == "Platform fee")
            .unwrap();
        assert_eq!(fee.amount, 100);
    }

    #[test]
    fn monthly_period_bills_per_started_block() {
        let config = PricingConfig {
            amount: 90000,
            currency: "USD".to_string(),
            deposit: None,
            service_charge: None,
            period: RentalPeriod::Month,
        };
        let one_month = PricingService::quote(&config, &range(30), &guests(), 4).unwrap();
        assert_eq!(one_month.lines[0].amount, 90000);

        let partial_second = PricingService::quote(&config, &range(31), &guests(), 4).unwrap();
        assert_eq!(partial_second.lines[0].amount, 180000);
    }

    #[test]
    fn rejects_zero_adults() {
        let no_adults = GuestCount {
            adults: 0,
            children: 2,
            infants: 0,
        };
        assert_eq!(
            PricingService::quote(&config(5000), &range(2), &no_adults, 4).unwrap_err(),
            PricingError::NoAdults
        );
    }

    #[test]
    fn infants_do_not_count_against_capacity() {
        let full_house = GuestCount {
            adults: 2,
            children: 2,
            infants: 3,
        };
        assert!(PricingService::quote(&config(5000), &range(2), &full_house, 4).is_ok());

        let over = GuestCount {
            adults: 3,
            children: 2,
            infants: 0,
        };
        assert!(matches!(
            PricingService::quote(&config(5000), &range(2), &over, 4),
            Err(PricingError::CapacityExceeded { .. })
        ));
    }

    #[test]
    fn rejects_non_positive_rate() {
        assert!(matches!(
            PricingService::quote(&config(0), &range(2), &guests(), 4),
            Err(PricingError::NonPositiveRate(0))
        ));
    }

    #[test]
    fn currency_mismatch_fails_loudly() {
        let err = PricingService::ensure_currency(&config(5000), "NGN").unwrap_err();
        assert_eq!(
            err,
            PricingError::CurrencyMismatch {
                expected: "NGN".to_string(),
                found: "USD".to_string(),
            }
        );
        assert!(PricingService::ensure_currency(&config(5000), "usd").is_ok());
    }
}
