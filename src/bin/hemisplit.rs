//! Hemisphere segmentation on NIfTI inputs
//!
//! Usage:
//!   hemisplit <t1> <white_matter> <gray_matter> <out_prefix> [options]
//!
//! Writes `<out_prefix>_left.nii.gz` and `<out_prefix>_right.nii.gz`.
//! Set `RUST_LOG=debug` for per-stage statistics.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

use hemisplit::edges::EdgeOperator;
use hemisplit::mesh::{apply_affine, write_obj, IsosurfaceExtractor, VoxelFaceExtractor};
use hemisplit::nifti_io::read_volume;
use hemisplit::planes::{mid_planes, save_overlay_png};
use hemisplit::{run_from_files, HemisphereParams, HemisphereSegmentation};

const USAGE: &str = "\
Usage: hemisplit <t1> <white_matter> <gray_matter> <out_prefix> [options]

Options:
  --threshold F        tissue probability threshold (default 0.2)
  --closing N          brain mask closing iterations (default 2)
  --min-object N       smallest brain component kept, in voxels (default 2000)
  --sigma F            edge smoothing sigma in voxels (default 1.0)
  --gradient3d         use a 3D central-difference gradient for edges
  --erosion N          seed erosion iterations (default 5)
  --margin N           seed exclusion band around the midline (default 2)
  --midline N          midline x index (default nx / 2)
  --cleanup-closing N  hemisphere closing iterations (default 2)
  --mesh               also write <out_prefix>_left.obj and <out_prefix>_right.obj
  --planes             also write <out_prefix>_planes.png (mid-plane overlays)";

struct CliArgs {
    t1: PathBuf,
    white_matter: PathBuf,
    gray_matter: PathBuf,
    out_prefix: PathBuf,
    params: HemisphereParams,
    mesh: bool,
    planes: bool,
}

fn parse_value<T: std::str::FromStr>(flag: &str, value: Option<String>) -> Result<T, String> {
    let value = value.ok_or_else(|| format!("{flag} needs a value"))?;
    value
        .parse()
        .map_err(|_| format!("invalid value for {flag}: {value}"))
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<CliArgs, String> {
    let mut positional = Vec::new();
    let mut params = HemisphereParams::default();
    let mut mesh = false;
    let mut planes = false;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--threshold" => params.mask.probability_threshold = parse_value(&arg, args.next())?,
            "--closing" => params.mask.closing_iterations = parse_value(&arg, args.next())?,
            "--min-object" => params.mask.min_object_size = parse_value(&arg, args.next())?,
            "--sigma" => params.edges.sigma = parse_value(&arg, args.next())?,
            "--gradient3d" => params.edges.operator = EdgeOperator::Gradient3d,
            "--erosion" => params.seeds.erosion_radius = parse_value(&arg, args.next())?,
            "--margin" => params.seeds.midline_margin = parse_value(&arg, args.next())?,
            "--midline" => params.seeds.midline = Some(parse_value(&arg, args.next())?),
            "--cleanup-closing" => params.cleanup.closing_iterations = parse_value(&arg, args.next())?,
            "--mesh" => mesh = true,
            "--planes" => planes = true,
            "-h" | "--help" => return Err(USAGE.to_string()),
            flag if flag.starts_with("--") => return Err(format!("unknown option {flag}\n\n{USAGE}")),
            _ => positional.push(PathBuf::from(arg)),
        }
    }

    let [t1, white_matter, gray_matter, out_prefix]: [PathBuf; 4] = positional
        .try_into()
        .map_err(|_| USAGE.to_string())?;

    Ok(CliArgs { t1, white_matter, gray_matter, out_prefix, params, mesh, planes })
}

fn export_meshes(seg: &HemisphereSegmentation, out_prefix: &std::path::Path) -> hemisplit::Result<()> {
    let (nx, ny, nz) = seg.dims;
    let prefix = out_prefix.to_string_lossy();
    for (side, mask) in [("left", &seg.left), ("right", &seg.right)] {
        let mut mesh = VoxelFaceExtractor.extract(mask, nx, ny, nz);
        mesh.vertices = apply_affine(&seg.affine, &mesh.vertices);
        let path = PathBuf::from(format!("{prefix}_{side}.obj"));
        write_obj(&path, &mesh)?;
        log::info!("Saved {} ({} vertices, {} faces)", path.display(), mesh.vertices.len(), mesh.faces.len());
    }
    Ok(())
}

fn export_planes(seg: &HemisphereSegmentation, t1_path: &std::path::Path, out_prefix: &std::path::Path) -> hemisplit::Result<()> {
    let (nx, ny, nz) = seg.dims;
    let t1 = read_volume(t1_path)?;
    let planes = mid_planes(&t1.data, &seg.left, &seg.right, nx, ny, nz);
    let path = PathBuf::from(format!("{}_planes.png", out_prefix.to_string_lossy()));
    save_overlay_png(&path, &planes)
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = match parse_args(std::env::args().skip(1)) {
        Ok(cli) => cli,
        Err(message) => {
            eprintln!("{message}");
            return ExitCode::from(2);
        }
    };

    let start = Instant::now();
    let seg = match run_from_files(&cli.t1, &cli.white_matter, &cli.gray_matter, &cli.out_prefix, &cli.params) {
        Ok(seg) => seg,
        Err(e) => {
            log::error!("{e}");
            return ExitCode::FAILURE;
        }
    };

    if cli.mesh {
        if let Err(e) = export_meshes(&seg, &cli.out_prefix) {
            log::error!("{e}");
            return ExitCode::FAILURE;
        }
    }

    if cli.planes {
        if let Err(e) = export_planes(&seg, &cli.t1, &cli.out_prefix) {
            log::error!("{e}");
            return ExitCode::FAILURE;
        }
    }

    log::info!(
        "Done in {:.2?}: left {} voxels, right {} voxels (midline x={})",
        start.elapsed(),
        seg.left_count(),
        seg.right_count(),
        seg.midline
    );
    ExitCode::SUCCESS
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> impl Iterator<Item = String> {
        list.iter().map(|s| s.to_string()).collect::<Vec<_>>().into_iter()
    }

    #[test]
    fn test_parse_positional_and_options() {
        let cli = parse_args(args(&[
            "t1.nii.gz", "wm.nii.gz", "gm.nii.gz", "out/hemis",
            "--erosion", "3", "--midline", "40", "--sigma", "0.5", "--mesh", "--planes",
        ]))
        .unwrap();
        assert_eq!(cli.t1, PathBuf::from("t1.nii.gz"));
        assert_eq!(cli.out_prefix, PathBuf::from("out/hemis"));
        assert_eq!(cli.params.seeds.erosion_radius, 3);
        assert_eq!(cli.params.seeds.midline, Some(40));
        assert_eq!(cli.params.edges.sigma, 0.5);
        assert_eq!(cli.params.mask.probability_threshold, 0.2);
        assert!(cli.mesh);
        assert!(cli.planes);
    }

    #[test]
    fn test_parse_rejects_missing_inputs_and_bad_values() {
        assert!(parse_args(args(&["t1.nii.gz", "wm.nii.gz"])).is_err());
        assert!(parse_args(args(&["a", "b", "c", "d", "--erosion", "x"])).is_err());
        assert!(parse_args(args(&["a", "b", "c", "d", "--margin"])).is_err());
        assert!(parse_args(args(&["a", "b", "c", "d", "--bogus"])).is_err());
    }
}
