use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use depth_to_mesh::{create_and_save_mesh_from_depth_image, depth, Outputs, Params};

/// Convert a depth image into a textured OBJ mesh.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Depth map path
    #[arg(long, default_value = "depth.png")]
    depth_path: PathBuf,

    /// Texture image for the mesh; no material is written when empty
    #[arg(long, default_value = "")]
    texture_path: String,

    /// Output path of the .obj file
    #[arg(long, default_value = "model.obj")]
    obj_path: PathBuf,

    /// Output path of the .mtl file
    #[arg(long, default_value = "model.mtl")]
    mtl_path: PathBuf,

    /// Name of the material to create
    #[arg(long, default_value = "colored")]
    mat_name: String,

    /// Factor converting raw depth values to meters
    #[arg(long, default_value_t = 0.001)]
    scale: f64,

    /// Vertical field of view in degrees
    #[arg(long, default_value_t = 45.0)]
    fov: f64,

    /// Channel holding depth in multi-channel images
    #[arg(long, default_value_t = 0)]
    channel: usize,

    /// Use 1 - depth, for encodings where larger values are closer
    #[arg(long, default_value_t = false)]
    invert: bool,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    println!("STARTED");
    let args = Args::parse();

    match run(args) {
        Ok(()) => {
            println!("FINISHED");
            ExitCode::SUCCESS
        }
        Err(err) => {
            log::error!("{:#}", err);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<()> {
    let outputs = Outputs {
        obj_path: args.obj_path,
        mtl_path: args.mtl_path,
        texture_path: Some(args.texture_path).filter(|p| !p.is_empty()),
    };

    let params = Params {
        depth_params: depth::Params {
            channel: args.channel,
            scale_to_meter: args.scale,
            invert: args.invert,
        },
        fov_degrees: args.fov,
        material_name: args.mat_name,
    };

    create_and_save_mesh_from_depth_image(&args.depth_path, &outputs, &params)
        .with_context(|| format!("Failed to convert {:?}", args.depth_path))?;

    Ok(())
}
