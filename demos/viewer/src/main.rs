use std::path::PathBuf;

use indirect_ngin::{
    Config, Matrix4, Scene, vec3,
    config::SkyboxFaces,
    context::Context,
    data_structures::material::Material,
    flow::{GraphicsFlow, run},
    input::InputEvent,
    resources::ImportOptions,
};

// floor tiles per side
const N_SIDE: usize = 16;

struct Viewer {
    res: PathBuf,
}

impl Viewer {
    fn model(&self, name: &str) -> PathBuf {
        self.res.join("models").join(name).join(format!("{name}.obj"))
    }

    fn build_floor(&self, scene: &mut Scene) -> anyhow::Result<()> {
        let diffuse = scene.insert_texture_color("floorDiffuse", [85, 170, 255, 255], false)?;
        let specular = scene.insert_texture_color("floorSpecular", [64, 64, 64, 255], false)?;
        let floor = scene.add_material(Material {
            diffuse: Some(diffuse),
            specular: Some(specular),
            normal: None,
            shininess: 1.0,
        })?;

        // Same index range as the cube, only the material differs
        let cube = *scene.store().part(0, 0)?;
        let floor_part = scene.add_part(0, cube.with_material(floor))?;

        let graph = scene.graph_mut();
        for i in 0..N_SIDE {
            for j in 0..N_SIDE {
                let x = 2.0 * i as f32 - N_SIDE as f32;
                let z = 2.0 * j as f32 - N_SIDE as f32;
                let node = graph.new_node(0, 1, 0);
                graph.add_part(node, floor_part)?;
                graph.set_transform(node, Matrix4::from_translation(vec3(x, -2.0, z)))?;
            }
        }
        Ok(())
    }
}

impl GraphicsFlow for Viewer {
    async fn on_init(&mut self, ctx: &mut Context, scene: &mut Scene) -> anyhow::Result<()> {
        // look over the floor from above its near edge
        let camera = &mut ctx.renderer.camera;
        camera.camera.position = (0.0, 2.0, 20.0).into();
        camera.touch();

        let options = ImportOptions::default();
        let at = |x, y, z| Matrix4::from_translation(vec3(x, y, z));

        scene.load(self.model("cube"), 0, at(5.0, 0.0, 0.0), &options).await?;
        self.build_floor(scene)?;
        if let Err(e) = scene
            .load(self.model("backpack"), 0, at(0.0, 1.0, 0.0), &options)
            .await
        {
            log::error!("Skipping backpack: {e:#}");
        }
        scene.load(self.model("cube"), 0, at(0.0, 0.0, 5.0), &options).await?;

        scene.build_cache()?;
        let cache = scene.cache();
        log::info!(
            "Scene ready: {} draw commands for {} instances",
            cache.command_count(),
            cache.instance_count()
        );
        Ok(())
    }

    fn on_event(&mut self, _ctx: &Context, _scene: &mut Scene, event: &InputEvent) {
        if let InputEvent::Resize { width, height } = event {
            log::debug!("Resized to {width}x{height}");
        }
    }
}

fn main() -> anyhow::Result<()> {
    let res = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("res"));
    let config = Config {
        title: "indirect-ngin viewer".to_string(),
        skybox: Some(SkyboxFaces::in_dir(res.join("skybox"), "jpg")),
        ..Default::default()
    };
    run(config, Viewer { res })
}
