//! Park viewer
//!
//! Generates a small park, paints it through the iso engine and writes the
//! frame to a PNG through the sheet's palette.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Arg, ArgAction, Command};
use image::RgbImage;
use iso_engine::prelude::*;
use iso_engine::{config::Config, foundation::logging};

mod park;
mod sheet;

use park::Park;

const DEFAULT_OUTPUT: &str = "park.png";

fn main() -> Result<()> {
    let matches = Command::new("park_viewer")
        .about("Renders a generated isometric park to PNG")
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .value_name("FILE")
                .help("PNG file to write")
                .default_value(DEFAULT_OUTPUT),
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Engine configuration (.toml or .ron)"),
        )
        .arg(
            Arg::new("sheet")
                .long("sheet")
                .value_name("FILE")
                .help("Load a sheet written by --save-sheet instead of building one"),
        )
        .arg(
            Arg::new("save-sheet")
                .long("save-sheet")
                .value_name("FILE")
                .help("Write the sheet in use to FILE"),
        )
        .arg(
            Arg::new("size")
                .short('s')
                .long("size")
                .value_name("TILES")
                .help("Park edge length in tiles")
                .value_parser(clap::value_parser!(usize))
                .default_value("12"),
        )
        .arg(
            Arg::new("seed")
                .long("seed")
                .value_name("N")
                .value_parser(clap::value_parser!(u64))
                .default_value("1"),
        )
        .arg(
            Arg::new("rotation")
                .short('r')
                .long("rotation")
                .value_name("0-3")
                .value_parser(clap::value_parser!(u8).range(0..4))
                .default_value("0"),
        )
        .arg(
            Arg::new("zoom")
                .short('z')
                .long("zoom")
                .value_name("LEVEL")
                .value_parser(clap::value_parser!(u8).range(0..4))
                .default_value("0"),
        )
        .arg(
            Arg::new("width")
                .long("width")
                .value_parser(clap::value_parser!(usize))
                .default_value("800"),
        )
        .arg(
            Arg::new("height")
                .long("height")
                .value_parser(clap::value_parser!(usize))
                .default_value("600"),
        )
        .arg(
            Arg::new("bound-boxes")
                .long("bound-boxes")
                .help("Outline every sprite's ordering box")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("arrange")
                .long("arrange")
                .help("Refine the draw order by bounding boxes")
                .action(ArgAction::SetTrue),
        )
        .get_matches();

    let mut config = match matches.get_one::<String>("config") {
        Some(path) => EngineConfig::load_from_file(path).with_context(|| format!("Failed to load config {path}"))?,
        None => EngineConfig::default(),
    };
    if matches.get_flag("bound-boxes") {
        config.paint.view_flags |= ViewFlags::BOUND_BOXES;
    }
    if matches.get_flag("arrange") {
        config.paint.sort_bounding_boxes = true;
    }
    config.validate()?;
    logging::init_with_level(&config.log_level);

    let sheet = match matches.get_one::<String>("sheet") {
        Some(path) => SpriteSheet::load(path, config.sheet.element_count_override)
            .with_context(|| format!("Failed to load sheet {path}"))?,
        None => sheet::build()?,
    };
    if let Some(path) = matches.get_one::<String>("save-sheet") {
        sheet.save(path).with_context(|| format!("Failed to save sheet {path}"))?;
        log::info!("Sheet saved: {}", path);
    }
    let palette = Palette::from_sheet(&sheet, sheet::PALETTE)?;

    let size = *matches.get_one::<usize>("size").unwrap_or(&12);
    let seed = *matches.get_one::<u64>("seed").unwrap_or(&1);
    let rotation = Rotation::from_index(*matches.get_one::<u8>("rotation").unwrap_or(&0));
    let zoom = *matches.get_one::<u8>("zoom").unwrap_or(&0);
    let width = *matches.get_one::<usize>("width").unwrap_or(&800);
    let height = *matches.get_one::<usize>("height").unwrap_or(&600);

    let park = Park::generate(size, seed);
    log::info!("Generated {0}x{0} park from seed {1}", park.size(), seed);

    // centre the view on the middle of the park
    let centre = project(park.centre(), rotation);
    let origin = ScreenCoords::new(
        centre.x - ((width as i32 / 2) << zoom),
        centre.y - ((height as i32 / 2) << zoom),
    );

    let mut engine = Engine::with_sheet(config, Arc::new(sheet));
    let mut framebuffer = FrameBuffer::filled(width, height, sheet::SKY);
    let stats = engine.render_frame(framebuffer.view_at(origin, zoom)?, rotation, |session, sheet| {
        park.paint(session, sheet);
        session.set_sprite_position(park.centre().x, park.centre().y);
        if let Err(err) = session.add_string(1, [size as i32, 0, 0, 0], 64, 0, &[]) {
            log::debug!("Park label skipped: {err}");
        }
    })?;
    log::info!(
        "Frame: {} sprites ({} chained), {} attachments, {} culled, {} dropped, quadrants {:?}",
        stats.inserted,
        stats.chained,
        stats.attachments,
        stats.culled,
        stats.dropped,
        stats.quadrant_range
    );

    match engine.hit_test(centre, |kind| kind != InteractionKind::None)? {
        Some(hit) => log::info!("Centre of view shows {:?} at {:?}", hit.kind, hit.map_position),
        None => log::info!("Centre of view is empty"),
    }

    let mut view = framebuffer.view_at(origin, zoom)?;
    let frame = view.visible_rect();
    rect_fill::stroke_rect(&mut view, frame, 2 << zoom, sheet::BORDER);

    let output = matches.get_one::<String>("output").map_or(DEFAULT_OUTPUT, String::as_str);
    write_png(&framebuffer, &palette, Path::new(output))?;
    log::info!("Wrote {}x{} frame to {}", width, height, output);
    Ok(())
}

fn write_png(framebuffer: &FrameBuffer, palette: &Palette, path: &Path) -> Result<()> {
    let rgb = palette.expand(framebuffer.pixels());
    let image = RgbImage::from_raw(framebuffer.width() as u32, framebuffer.height() as u32, rgb)
        .context("Framebuffer does not match its own dimensions")?;
    image
        .save(path)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}
