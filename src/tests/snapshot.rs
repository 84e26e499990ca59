/// Snapshot a serializable value as JSON. Any `loaded_at` field, as carried
/// by a policy version, is masked so snapshots stay stable across runs.
#[macro_export]
macro_rules! snapshot_json {
    ($value:expr, @$snapshot:literal) => {{
        let mut settings = insta::Settings::clone_current();
        settings.add_redaction(".**.loaded_at", "[timestamp]");
        settings.bind(|| {
            insta::assert_json_snapshot!($value, @$snapshot);
        });
    }};
}
