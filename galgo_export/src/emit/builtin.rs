//! Built-in emitters for the stock component set. Each one constructs the
//! runtime counterpart, inlines literal fields, and registers everything
//! else with the reference registry for the resolver pass.

use galgo_graph::{Component, ComponentKind, Value};

use super::{EmitArgs, EmitResult, Emitter};
use crate::expr::fmt_f32;

pub fn builtin_emitters() -> Vec<Box<dyn Emitter>> {
    vec![
        Box::new(SpriteEmitter),
        Box::new(MeshRendererEmitter),
        Box::new(CameraEmitter),
        Box::new(AudioSourceEmitter),
        Box::new(SubGraphEmitter),
        Box::new(ScriptEmitter),
    ]
}

/// Construct the component on the current node and return its variable, or
/// None when this identity was already emitted via another reference path
/// (idempotence: the registry's instance table de-duplicates).
fn declare_component(
    args: &mut EmitArgs<'_>,
    component: &Component,
    hint: &str,
) -> Option<String> {
    let var = args.ctx.fresh_var("c", hint);
    if !args
        .registry
        .register_instance(&var, component.id(), component.type_name().to_string())
    {
        return None;
    }
    let node_var = args.ctx.current_var.clone();
    args.writer.line(&format!(
        "let {var} = scene.add_component({node_var}, \"{}\");",
        component.kind().as_str()
    ));
    Some(var)
}

pub struct SpriteEmitter;

impl Emitter for SpriteEmitter {
    fn kind(&self) -> ComponentKind {
        ComponentKind::Sprite
    }

    fn emit(&self, component: &Component, args: &mut EmitArgs<'_>) -> EmitResult {
        let Component::Sprite(sprite) = component else {
            return EmitResult::failed();
        };
        let Some(var) = declare_component(args, component, "sprite") else {
            return EmitResult::ok();
        };
        args.emit_field(&var, "flip_x", &Value::Bool(sprite.flip_x));
        args.emit_field(&var, "flip_y", &Value::Bool(sprite.flip_y));
        args.emit_field(&var, "sorting", &Value::I32(sprite.sorting));
        args.emit_field(&var, "tint", &sprite.tint);
        args.emit_field(&var, "texture", &sprite.texture);
        EmitResult::ok()
    }
}

pub struct MeshRendererEmitter;

impl Emitter for MeshRendererEmitter {
    fn kind(&self) -> ComponentKind {
        ComponentKind::MeshRenderer
    }

    fn emit(&self, component: &Component, args: &mut EmitArgs<'_>) -> EmitResult {
        let Component::MeshRenderer(mesh) = component else {
            return EmitResult::failed();
        };
        let Some(var) = declare_component(args, component, "mesh") else {
            return EmitResult::ok();
        };
        args.emit_field(&var, "cast_shadows", &Value::Bool(mesh.cast_shadows));
        args.emit_field(&var, "mesh", &mesh.mesh);
        args.emit_field(&var, "material", &mesh.material);
        EmitResult::ok()
    }
}

pub struct CameraEmitter;

impl Emitter for CameraEmitter {
    fn kind(&self) -> ComponentKind {
        ComponentKind::Camera
    }

    fn emit(&self, component: &Component, args: &mut EmitArgs<'_>) -> EmitResult {
        let Component::Camera(camera) = component else {
            return EmitResult::failed();
        };
        let Some(var) = declare_component(args, component, "camera") else {
            return EmitResult::ok();
        };
        args.writer.line(&format!(
            "scene.set({var}, \"fov\", lit({}));",
            fmt_f32(camera.fov)
        ));
        args.emit_field(&var, "active", &Value::Bool(camera.active));
        args.emit_field(&var, "clear_color", &camera.clear_color);
        EmitResult::ok()
    }
}

pub struct AudioSourceEmitter;

impl Emitter for AudioSourceEmitter {
    fn kind(&self) -> ComponentKind {
        ComponentKind::AudioSource
    }

    fn emit(&self, component: &Component, args: &mut EmitArgs<'_>) -> EmitResult {
        let Component::AudioSource(audio) = component else {
            return EmitResult::failed();
        };
        let Some(var) = declare_component(args, component, "audio") else {
            return EmitResult::ok();
        };
        args.emit_field(&var, "volume", &Value::F32(audio.volume));
        args.emit_field(&var, "autoplay", &Value::Bool(audio.autoplay));
        args.emit_field(&var, "clip", &audio.clip);
        args.emit_field(&var, "on_finished", &audio.on_finished);
        EmitResult::ok()
    }
}

pub struct SubGraphEmitter;

impl Emitter for SubGraphEmitter {
    fn kind(&self) -> ComponentKind {
        ComponentKind::SubGraph
    }

    fn emit(&self, component: &Component, args: &mut EmitArgs<'_>) -> EmitResult {
        let Component::SubGraph(instance) = component else {
            return EmitResult::failed();
        };
        let Some(var) = declare_component(args, component, "subgraph") else {
            return EmitResult::hierarchy();
        };
        // The instanced graph is an independent export boundary; its
        // artifact path is resolved through the asset cache.
        args.registry.register_field_named(
            &var,
            "source",
            Value::Asset(instance.source.clone()),
            instance.source.file_name().to_string(),
        );
        for (name, value) in &instance.overrides {
            args.emit_field(&var, name, value);
        }
        EmitResult::hierarchy()
    }
}

pub struct ScriptEmitter;

impl Emitter for ScriptEmitter {
    fn kind(&self) -> ComponentKind {
        ComponentKind::Script
    }

    fn emit(&self, component: &Component, args: &mut EmitArgs<'_>) -> EmitResult {
        let Component::Script(script) = component else {
            return EmitResult::failed();
        };
        // Known-unavailable types (e.g. editor-session scripts) are skipped;
        // types the manifest never saw are exported optimistically and
        // looked up by name at load time.
        if args.registry.type_availability(&script.type_name) == Some(false) {
            log::debug!(
                "skipping script `{}` on `{}`: type not importable",
                script.type_name,
                args.node.name
            );
            return EmitResult::ok();
        }
        let var = args.ctx.fresh_var("c", &script.type_name);
        if !args
            .registry
            .register_instance(&var, script.id, script.type_name.clone())
        {
            return EmitResult::ok();
        }
        let node_var = args.ctx.current_var.clone();
        args.writer.line(&format!(
            "let {var} = scene.add_script({node_var}, \"{}\");",
            script.type_name
        ));
        for (name, value) in &script.fields {
            args.emit_field(&var, name, value);
        }
        EmitResult::ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ExportContext;
    use crate::emit::EmitterDispatch;
    use crate::registry::ReferenceRegistry;
    use crate::writer::CodeWriter;
    use galgo_graph::{AssetKind, AssetRef, Node, ScriptComponent, Sprite};
    use galgo_ids::StableId;

    fn sprite_component() -> Component {
        Component::Sprite(Sprite {
            id: StableId::from_path("res://sprite-1"),
            texture: Value::Asset(AssetRef::new(AssetKind::Texture, "res://player.png")),
            tint: Value::Color { r: 1.0, g: 1.0, b: 1.0, a: 1.0 },
            flip_x: true,
            flip_y: false,
            sorting: 3,
        })
    }

    #[test]
    fn sprite_inlines_literals_and_registers_texture() {
        let component = sprite_component();
        let node = Node::new("Player");
        let mut ctx = ExportContext::new(1);
        ctx.current_var = "n_0_player".to_string();
        let mut registry = ReferenceRegistry::new();
        let mut writer = CodeWriter::new();
        let dispatch = EmitterDispatch::with_builtins();

        let result = dispatch
            .run(
                &component,
                &mut EmitArgs {
                    node: &node,
                    ctx: &mut ctx,
                    registry: &mut registry,
                    writer: &mut writer,
                },
            )
            .unwrap();
        assert!(result.success);

        let text = writer.into_string();
        assert!(text.contains("scene.add_component(n_0_player, \"Sprite\")"));
        assert!(text.contains("\"flip_x\", lit(true)"));
        assert!(text.contains("\"tint\", rgba(1.0, 1.0, 1.0, 1.0)"));
        assert!(!text.contains("texture"), "texture must defer to resolver");
        assert_eq!(registry.pending_count(), 1);
        assert_eq!(registry.instance_count(), 1);
    }

    #[test]
    fn second_emission_of_same_identity_is_silent() {
        let component = sprite_component();
        let node = Node::new("Player");
        let mut ctx = ExportContext::new(1);
        ctx.current_var = "n_0_player".to_string();
        let mut registry = ReferenceRegistry::new();
        let dispatch = EmitterDispatch::with_builtins();

        let mut first = CodeWriter::new();
        dispatch.run(
            &component,
            &mut EmitArgs {
                node: &node,
                ctx: &mut ctx,
                registry: &mut registry,
                writer: &mut first,
            },
        );
        let first_path = registry.try_get_path(component.id()).unwrap().to_string();

        let mut second = CodeWriter::new();
        dispatch.run(
            &component,
            &mut EmitArgs {
                node: &node,
                ctx: &mut ctx,
                registry: &mut registry,
                writer: &mut second,
            },
        );

        assert!(second.into_string().is_empty());
        assert_eq!(registry.try_get_path(component.id()).unwrap(), first_path);
        assert_eq!(registry.instance_count(), 1);
    }

    #[test]
    fn unavailable_script_type_is_skipped() {
        let component = Component::Script(ScriptComponent {
            id: StableId::random(),
            type_name: "EditorCameraRig".into(),
            fields: vec![("speed".into(), Value::F32(2.0))],
        });
        let node = Node::new("Rig");
        let mut ctx = ExportContext::new(1);
        ctx.current_var = "n_0_rig".to_string();
        let mut registry = ReferenceRegistry::new();
        registry.set_known_type("EditorCameraRig", false);
        let mut writer = CodeWriter::new();
        let dispatch = EmitterDispatch::with_builtins();

        let result = dispatch
            .run(
                &component,
                &mut EmitArgs {
                    node: &node,
                    ctx: &mut ctx,
                    registry: &mut registry,
                    writer: &mut writer,
                },
            )
            .unwrap();
        assert!(result.success);
        assert!(writer.into_string().is_empty());
        assert_eq!(registry.instance_count(), 0);
    }
}
