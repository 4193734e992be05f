#![cfg(feature = "serde")]

use dout::{PortConfig, PortWidth, Settle};

#[test]
fn partial_config_uses_defaults() {
    let config: PortConfig = serde_json::from_str(r#"{ "width": 16 }"#).unwrap();
    assert_eq!(config.width, PortWidth::Bits16);
    assert_eq!(config.bit_shift, 0);
    assert_eq!(config.settle, Settle::default());
}

#[test]
fn settle_modes() {
    let config: PortConfig = serde_json::from_str(
        r#"{ "bit_shift": 2, "toggle_mask": 524288, "settle": { "mode": "deadline", "micros": 50 } }"#,
    )
    .unwrap();
    assert_eq!(config.settle, Settle::Deadline { micros: 50 });
    assert_eq!(config.toggle_mask, 0x80000);

    let disabled: PortConfig =
        serde_json::from_str(r#"{ "settle": { "mode": "disabled" } }"#).unwrap();
    assert_eq!(disabled.settle, Settle::Disabled);
}

#[test]
fn rejects_unsupported_width() {
    let err = serde_json::from_str::<PortConfig>(r#"{ "width": 24 }"#).unwrap_err();
    assert!(err.to_string().contains("unsupported port width"));
}

#[test]
fn width_serializes_as_bits() {
    let json = serde_json::to_value(PortConfig::default()).unwrap();
    assert_eq!(json["width"], 32);
    assert_eq!(json["settle"]["mode"], "spin");
}
