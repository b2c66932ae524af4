use crate::test_helpers::factory::Factory;

#[test]
fn rows_conform_to_schema_and_repeat_per_seed() {
    let schema = Factory::schema().create();
    let rows = Factory::rows(schema.clone()).with_seed(7).create_list(20);
    let again = Factory::rows(schema.clone()).with_seed(7).create_list(20);

    assert_eq!(rows, again);
    for row in &rows {
        assert_eq!(row.len(), schema.field_count());
        for (value, field) in row.values().iter().zip(schema.fields()) {
            assert!(value.conforms_to(&field.data_type));
            if !field.nullable {
                assert!(!value.is_null());
            }
        }
    }
}
