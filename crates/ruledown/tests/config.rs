#![cfg(feature = "serde")]

use ruledown::{
    BulletListMarker, Document, Engine, Escaping, Fence, HeadingStyle, LinkStyle, NodeId, Options,
};

#[test]
fn partial_config_keeps_defaults() {
    let options: Options = serde_json::from_str(
        r#"{"heading_style": "atx", "bullet_list_marker": "dash", "fence": "tilde"}"#,
    )
    .unwrap();

    assert_eq!(options.heading_style, HeadingStyle::Atx);
    assert_eq!(options.bullet_list_marker, BulletListMarker::Dash);
    assert_eq!(options.fence, Fence::Tilde);
    assert_eq!(options.hr, "* * *");
    assert_eq!(options.br, "  ");
    assert_eq!(options.link_style, LinkStyle::Inlined);
    assert_eq!(options.escaping, Escaping::Markdown);
}

#[test]
fn config_survives_serialization() {
    let options = Options {
        heading_style: HeadingStyle::Atx,
        hr: "---".to_string(),
        preformatted_code: true,
        escaping: Escaping::Minimal,
        ..Default::default()
    };

    let json = serde_json::to_string(&options).unwrap();
    assert!(json.contains(r#""heading_style":"atx""#));
    assert!(json.contains(r#""escaping":"minimal""#));

    let parsed: Options = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, options);
}

#[test]
fn unknown_variant_is_rejected() {
    let result = serde_json::from_str::<Options>(r#"{"heading_style": "underline"}"#);
    assert!(result.is_err());
}

#[test]
fn loaded_config_drives_conversion() {
    let options: Options = serde_json::from_str(r#"{"heading_style": "atx"}"#).unwrap();

    let mut doc = Document::new();
    let h1 = doc.append_element(NodeId::ROOT, "h1");
    doc.append_text(h1, "Title");

    assert_eq!(Engine::with_options(options).convert(&doc).unwrap(), "# Title");
}
