use rand::Rng;

/// Generate a uniformly random 6-digit OTP.
pub fn generate_otp() -> i32 {
    rand::thread_rng().gen_range(100_000..=999_999)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn otp_is_always_six_digits() {
        for _ in 0..1000 {
            let otp = generate_otp();
            assert!((100_000..=999_999).contains(&otp));
        }
    }
}
