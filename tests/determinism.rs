//! Determinism: identical (template, environment) inputs must always yield
//! byte-identical program text and identical binding tables.

use arbp::{compile, BuiltinStore, Environment, Value};
use proptest::prelude::*;

fn label_env(texture_is_2d: bool, outline: bool, inv_num_labels: f64) -> Environment {
    Environment::new()
        .with("invNumLabels", Value::Number(inv_num_labels))
        .with("outline", Value::Bool(outline))
        .with("voxValXform", Value::param())
        .with("imageTexture", Value::texture(0))
        .with("lutTexture", Value::texture(1))
        .with("texCoord", Value::varying())
        .with("texture_is_2d", Value::Bool(texture_is_2d))
}

proptest! {
    #[test]
    fn label_compilation_is_deterministic(
        texture_is_2d in any::<bool>(),
        outline in any::<bool>(),
        inv_num_labels in 0.001f64..1.0,
    ) {
        let env = label_env(texture_is_2d, outline, inv_num_labels);
        let first = compile(&BuiltinStore, "gllabel_frag.prog", &env).unwrap();
        let second = compile(&BuiltinStore, "gllabel_frag.prog", &env).unwrap();
        prop_assert_eq!(&first.text, &second.text);
        prop_assert_eq!(first.bindings(), second.bindings());
    }

    #[test]
    fn exactly_one_texture_dimension_survives(
        texture_is_2d in any::<bool>(),
        outline in any::<bool>(),
    ) {
        let env = label_env(texture_is_2d, outline, 0.1);
        let program = compile(&BuiltinStore, "gllabel_frag.prog", &env).unwrap();
        let has_2d = program.text.contains(", 2D;");
        let has_3d = program.text.contains(", 3D;");
        prop_assert_eq!(has_2d, texture_is_2d);
        prop_assert_eq!(has_3d, !texture_is_2d);
        prop_assert_eq!(program.text.matches("END").count(), 1);
    }
}

#[test]
fn environment_insertion_order_does_not_matter() {
    let forward = label_env(false, true, 0.25);
    let reversed = Environment::new()
        .with("texture_is_2d", Value::Bool(false))
        .with("texCoord", Value::varying())
        .with("lutTexture", Value::texture(1))
        .with("imageTexture", Value::texture(0))
        .with("voxValXform", Value::param())
        .with("outline", Value::Bool(true))
        .with("invNumLabels", Value::Number(0.25));
    let a = compile(&BuiltinStore, "gllabel_frag.prog", &forward).unwrap();
    let b = compile(&BuiltinStore, "gllabel_frag.prog", &reversed).unwrap();
    assert_eq!(a, b);
}
