use super::{PhysicalLayout, TypeTag};

#[test]
fn offsets_only_for_variable_and_list_layouts() {
    for tag in TypeTag::ALL {
        let expect_offsets = matches!(tag, TypeTag::Utf8 | TypeTag::Binary | TypeTag::Array);
        assert_eq!(tag.layout().has_offsets(), expect_offsets, "{tag}");
    }
    assert_eq!(TypeTag::Decimal.layout(), PhysicalLayout::Fixed { width: 16 });
    assert_eq!(TypeTag::Date.layout(), PhysicalLayout::Fixed { width: 4 });
}
