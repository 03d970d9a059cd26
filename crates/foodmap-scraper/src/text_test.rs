use super::*;

// -----------------------------------------------------------------------
// clean
// -----------------------------------------------------------------------

#[test]
fn clean_strips_tags_and_collapses_whitespace() {
    assert_eq!(
        clean("<p>Fresh   <b>basil</b>\n and tomato</p>"),
        "Fresh basil and tomato"
    );
}

#[test]
fn clean_decodes_named_and_numeric_entities() {
    assert_eq!(clean("Fish &amp; chips &euro;"), "Fish & chips €");
    assert_eq!(clean("Chef&#39;s special &#x2013; spicy"), "Chef's special – spicy");
    assert_eq!(clean("Pasta&nbsp;al&nbsp;pesto"), "Pasta al pesto");
}

#[test]
fn clean_removes_escaped_markup_and_double_escaped_entities() {
    assert_eq!(clean("&lt;b&gt;Organic whole milk&lt;/b&gt;"), "Organic whole milk");
    assert_eq!(clean("Pain &amp;amp; chocolat"), "Pain & chocolat");
    assert_eq!(clean("&amp;lt;i&amp;gt;Brie&amp;lt;/i&amp;gt; de Meaux"), "Brie de Meaux");
}

#[test]
fn cleaning_twice_changes_nothing() {
    for raw in [
        "&lt;b&gt;Organic whole milk&lt;/b&gt;",
        "Pain &amp;amp; chocolat",
        "<p>\"Tarte &amp;amp;amp; cr&#232;me\"</p>",
        "  • Croque monsieur, ",
        "Fish &amp; chips &euro;",
    ] {
        let once = clean(raw);
        assert_eq!(clean(&once), once, "{raw:?}");
    }
}

#[test]
fn clean_trims_surrounding_quotes_and_separators() {
    assert_eq!(clean("\"Margherita\""), "Margherita");
    assert_eq!(clean("  • Croque monsieur, "), "Croque monsieur");
    assert_eq!(clean("«Tarte Tatin»"), "Tarte Tatin");
}

#[test]
fn clean_keeps_parentheses() {
    assert_eq!(clean("(4,80 €/kg)"), "(4,80 €/kg)");
}

#[test]
fn clean_of_empty_is_empty() {
    assert_eq!(clean(""), "");
    assert_eq!(clean("   "), "");
}

// -----------------------------------------------------------------------
// price / quantity shapes
// -----------------------------------------------------------------------

#[test]
fn price_and_quantity_fragments_are_rejected() {
    let rules = TextRules::default();
    for text in [
        "(4,80 €/kg)",
        "9 pcs • 23.5 g",
        "4 x 500ml",
        "6×33 cl",
        "12,50 €",
        "3,99 € • 250 g",
        "1234567890",
        "Pho",
        "-- / --",
    ] {
        assert!(
            rules.is_price_or_quantity_only(text),
            "{text:?} should be rejected"
        );
    }
}

#[test]
fn realistic_product_descriptions_survive() {
    let rules = TextRules::default();
    for text in [
        "Fresh organic tomatoes from Provence",
        "Semi-skimmed milk bottle 1L",
        "Pack of 6 sparkling water bottles",
        "Emmental râpé 200 g",
        "Baguette tradition",
    ] {
        assert!(
            !rules.is_price_or_quantity_only(text),
            "{text:?} should survive"
        );
    }
}

#[test]
fn short_titles_are_not_rejected_by_length() {
    assert!(!has_price_or_quantity_shape("Ramen"));
    assert!(has_price_or_quantity_shape("500 g"));
    assert!(has_price_or_quantity_shape("12"));
}

// -----------------------------------------------------------------------
// UI noise
// -----------------------------------------------------------------------

#[test]
fn exact_ui_tokens_are_noise() {
    let rules = TextRules::default();
    assert!(rules.is_ui_noise("Add"));
    assert!(rules.is_ui_noise("  ORDER NOW "));
    assert!(rules.is_ui_noise("Ajouter au panier"));
    assert!(rules.is_ui_noise(""));
}

#[test]
fn short_text_containing_a_ui_word_is_noise() {
    let rules = TextRules::default();
    assert!(rules.is_ui_noise("Customize your order"));
    assert!(rules.is_ui_noise("Popular items"));
}

#[test]
fn short_text_containing_a_ui_token_inside_a_word_is_noise() {
    let rules = TextRules::default();
    assert!(rules.is_ui_noise("Padded bun burger"));
    assert!(rules.is_ui_noise("Unpopular opinion"));
}

#[test]
fn short_text_without_any_ui_token_is_not_noise() {
    let rules = TextRules::default();
    assert!(!rules.is_ui_noise("Salade niçoise"));
    assert!(!rules.is_ui_noise("Poke bowl saumon"));
}

#[test]
fn long_text_mentioning_a_ui_word_is_not_noise() {
    let rules = TextRules::default();
    assert!(!rules.is_ui_noise(
        "Grilled chicken, rice and vegetables; add a sauce of your choice"
    ));
}

// -----------------------------------------------------------------------
// acceptance
// -----------------------------------------------------------------------

#[test]
fn accept_title_allows_short_dish_names() {
    let rules = TextRules::default();
    assert_eq!(rules.accept_title("Ramen").as_deref(), Some("Ramen"));
    assert_eq!(rules.accept_title("<span>Pho</span>").as_deref(), Some("Pho"));
    assert!(rules.accept_title("Ok").is_none());
    assert!(rules.accept_title("Add").is_none());
    assert!(rules.accept_title("12,50 €").is_none());
}

#[test]
fn accept_description_enforces_bounds() {
    let rules = TextRules::default();
    assert!(rules.accept_description("Too short").is_none());
    assert_eq!(
        rules
            .accept_description("Tomato, mozzarella &amp; basil")
            .as_deref(),
        Some("Tomato, mozzarella & basil")
    );
    assert!(rules.accept_description(&"a".repeat(401)).is_none());
}

#[test]
fn accept_product_line_uses_narrow_band() {
    let rules = TextRules::default();
    let long = format!("Organic {}", "apple ".repeat(40));
    assert!(rules.accept_product(&long).is_some());
    assert!(rules.accept_product_line(&long).is_none());
    assert!(rules.accept_product_line("(4,80 €/kg)").is_none());
}
