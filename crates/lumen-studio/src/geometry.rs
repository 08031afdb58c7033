//! Procedural meshes and textures for the demo scene.

use glam::{Vec3, Vec4};
use lumen_engine::render::{MeshVertex, SkyVertex};

/// Axis-aligned cube of edge 2 centered at the origin, 36 vertices with
/// outward normals and per-face uvs.
pub fn cube_vertices() -> Vec<MeshVertex> {
    // (normal, u axis, v axis) per face.
    const FACES: [(Vec3, Vec3, Vec3); 6] = [
        (Vec3::X, Vec3::NEG_Z, Vec3::Y),
        (Vec3::NEG_X, Vec3::Z, Vec3::Y),
        (Vec3::Y, Vec3::X, Vec3::NEG_Z),
        (Vec3::NEG_Y, Vec3::X, Vec3::Z),
        (Vec3::Z, Vec3::X, Vec3::Y),
        (Vec3::NEG_Z, Vec3::NEG_X, Vec3::Y),
    ];
    // Two counter-clockwise triangles in (u, v) face space.
    const CORNERS: [(f32, f32); 6] = [
        (-1.0, -1.0),
        (1.0, -1.0),
        (1.0, 1.0),
        (-1.0, -1.0),
        (1.0, 1.0),
        (-1.0, 1.0),
    ];

    FACES
        .iter()
        .flat_map(|&(n, u, v)| {
            CORNERS.iter().map(move |&(cu, cv)| {
                let p = n + u * cu + v * cv;
                MeshVertex::new(p.to_array(), n.to_array(), [(cu + 1.0) * 0.5, (cv + 1.0) * 0.5])
            })
        })
        .collect()
}

/// Inside-facing unit cube for the skybox (culling is off, so winding only
/// matters for consistency).
pub fn sky_cube() -> Vec<SkyVertex> {
    cube_vertices()
        .into_iter()
        .map(|v| SkyVertex { position: v.position.map(|c| c * 0.5) })
        .collect()
}

/// `size`×`size` RGBA8 checkerboard with `cells` squares per side.
pub fn checker_pixels(size: u32, cells: u32, a: [u8; 4], b: [u8; 4]) -> Vec<u8> {
    let cell = (size / cells.max(1)).max(1);
    let mut pixels = Vec::with_capacity((size * size * 4) as usize);
    for y in 0..size {
        for x in 0..size {
            let even = ((x / cell) + (y / cell)) % 2 == 0;
            pixels.extend_from_slice(if even { &a } else { &b });
        }
    }
    pixels
}

/// Cube map faces (+X, -X, +Y, -Y, +Z, -Z) shading a vertical gradient:
/// `horizon` at the horizon, blending to `zenith` straight up and `ground`
/// straight down.
pub fn gradient_cubemap(size: u32, zenith: Vec4, horizon: Vec4, ground: Vec4) -> Vec<u8> {
    let mut pixels = Vec::with_capacity((size * size * 4 * 6) as usize);
    for face in 0..6 {
        for y in 0..size {
            for x in 0..size {
                let sc = (x as f32 + 0.5) / size as f32 * 2.0 - 1.0;
                let tc = (y as f32 + 0.5) / size as f32 * 2.0 - 1.0;
                let up = face_direction(face, sc, tc).normalize().y;
                let color = if up >= 0.0 {
                    horizon.lerp(zenith, up)
                } else {
                    horizon.lerp(ground, -up)
                };
                pixels.extend_from_slice(&to_rgba8(color));
            }
        }
    }
    pixels
}

/// Direction through face coordinate `(sc, tc)` of cube map face `face`.
fn face_direction(face: usize, sc: f32, tc: f32) -> Vec3 {
    match face {
        0 => Vec3::new(1.0, -tc, -sc),
        1 => Vec3::new(-1.0, -tc, sc),
        2 => Vec3::new(sc, 1.0, tc),
        3 => Vec3::new(sc, -1.0, -tc),
        4 => Vec3::new(sc, -tc, 1.0),
        _ => Vec3::new(-sc, -tc, -1.0),
    }
}

fn to_rgba8(c: Vec4) -> [u8; 4] {
    c.clamp(Vec4::ZERO, Vec4::ONE).to_array().map(|v| (v * 255.0).round() as u8)
}
