//! Legacy credit unit: 1,000,000 credits are worth 1 EUR.

pub const CREDITS_PER_EUR: f64 = 1_000_000.0;

pub fn credits_to_eur(credits: f64) -> f64 {
    credits / CREDITS_PER_EUR
}

pub fn eur_to_credits(eur: f64) -> f64 {
    eur * CREDITS_PER_EUR
}
