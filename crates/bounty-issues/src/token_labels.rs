pub const WRAPPED_SOL_MINT: &str = "So11111111111111111111111111111111111111112";
pub const USDC_MINT: &str = "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v";

/// Human label for a token mint; unknown mints read as "tokens".
pub fn token_label(token_address: &str) -> &'static str {
    match token_address.trim() {
        WRAPPED_SOL_MINT => "SOL",
        USDC_MINT => "USDC",
        _ => "tokens",
    }
}

#[cfg(test)]
mod tests {
    use super::{token_label, USDC_MINT, WRAPPED_SOL_MINT};

    #[test]
    fn unit_token_label_maps_well_known_mints() {
        assert_eq!(token_label(WRAPPED_SOL_MINT), "SOL");
        assert_eq!(token_label(USDC_MINT), "USDC");
    }

    #[test]
    fn regression_token_label_falls_back_for_unknown_and_case_variants() {
        assert_eq!(
            token_label("DezXAZ8z7PnrnRJjz3wXBoRgixCa6xjnB7YaB1pPB263"),
            "tokens"
        );
        assert_eq!(
            token_label("so11111111111111111111111111111111111111112"),
            "tokens"
        );
    }
}
