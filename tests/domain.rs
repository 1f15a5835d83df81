use assert_matches::assert_matches;
use xc_harvest::domain::{ApiKey, Binomial, SpeciesQuery};
use xc_harvest::error::HarvestError;

#[test]
fn query_for_species_country_and_quality() {
    let query = SpeciesQuery::new("Otus sunia", Some("China"), Some("q:A")).unwrap();
    assert_eq!(query.query_string(), "gen:Otus sp:sunia cnt:China q:A");
}

#[test]
fn query_without_filters() {
    let query = SpeciesQuery::new("Caprimulgus jotaka", None, Some("   ")).unwrap();
    assert_eq!(query.query_string(), "gen:Caprimulgus sp:jotaka");
}

#[test]
fn quality_is_appended_verbatim() {
    let query = SpeciesQuery::new("Otus sunia", None, Some("q:\">C\"")).unwrap();
    assert_eq!(query.query_string(), "gen:Otus sp:sunia q:\">C\"");
}

#[test]
fn binomial_rejects_wrong_token_counts() {
    for name in ["", "Otus", "Otus sunia japonicus"] {
        assert_matches!(
            name.parse::<Binomial>(),
            Err(HarvestError::InvalidBinomial(_))
        );
    }
    let binomial: Binomial = "Otus sunia".parse().unwrap();
    assert_eq!(binomial.to_string(), "Otus sunia");
}

#[test]
fn placeholder_and_empty_keys_are_rejected() {
    for raw in [
        None,
        Some(""),
        Some("   "),
        Some("YOUR_API_KEY"),
        Some("your_api_key_here"),
        Some("<api-key>"),
    ] {
        assert_matches!(ApiKey::new(raw), Err(HarvestError::MissingApiKey));
    }
    let key = ApiKey::new(Some(" 0123abcd ")).unwrap();
    assert_eq!(key.as_str(), "0123abcd");
}
