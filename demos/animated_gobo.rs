//! Animated tile projection onto a floor slab.
//!
//! A parallel projector sweeps over a floor while stepping through a 6-frame
//! tile strip at 20 tiles per second. The projector is driven by an ECS entity,
//! so moving the entity moves the projected image. Renders 90 frames offscreen
//! and saves three of them as PNGs under `out/`.

use std::cell::RefCell;
use std::rc::Rc;

use gobo::*;

fn main() {
    env_logger::init();

    let gpu = GpuContext::headless(800, 600);

    let queue = Rc::new(RefCell::new(MeshQueue::new()));
    let depth = Rc::new(RefCell::new(DepthBuffer::new(&gpu)));
    let projectors = Rc::new(RefCell::new(ProjectorSet::new()));

    let (ground, sphere, strip) = {
        let mut q = queue.borrow_mut();
        let ground = q.add_mesh(Mesh::cube(&gpu, Vec3::new(10.0, 0.1, 10.0)));
        let sphere = q.add_mesh(Mesh::sphere(&gpu, 32, 32));
        let strip = q.add_texture(Texture::tile_strip(&gpu, 128, 6, Color::rgb(0.3, 0.9, 1.0)));
        (ground, sphere, strip)
    };

    // Parallel projector: the beam stays 3x3 units no matter the distance, and
    // only the floor receives it.
    let projector_id = projectors.borrow_mut().add(
        Projector::new(
            Camera::new().parallel(1.5, 1.5, 1.0, 5.0),
            strip,
        )
        .with_target(vec![ground]),
    );

    // Rotation taking the camera's -Z forward to straight down (with X as up)
    let down = Quat::from_mat3(&Mat3::from_cols(Vec3::Z, Vec3::X, Vec3::Y));

    let mut world = World::new();
    world.spawn((Transform::new(), RenderMesh::new(ground, Color::LIGHT_GRAY)));
    world.spawn((
        Transform::from_position(Vec3::new(0.0, 0.5, 0.0)),
        RenderMesh::new(sphere, Color::ORANGE),
    ));
    let beam = world.spawn((
        Transform::from_position(Vec3::new(1.0, 2.1, 2.0)).rotation(down),
        RenderProjector::new(projector_id),
    ));

    let mut graph = RenderGraph::builder()
        .node(
            MeshNode::new(&gpu, Rc::clone(&queue), Rc::clone(&depth))
                .with_clear(Color::rgb(0.05, 0.06, 0.1)),
        )
        .node(ProjectorNode::new(
            &gpu,
            Rc::clone(&projectors),
            Rc::clone(&queue),
            Rc::clone(&depth),
            TileAnimation::new(6, 1, 20.0),
        ))
        .build(&gpu);

    let camera = Camera::new()
        .at(Vec3::new(-4.0, 4.0, -4.0))
        .looking_at(Vec3::ZERO)
        .perspective(45.0, gpu.aspect(), 0.1, 1000.0);

    let output = RenderTarget::new(&gpu, "Output");
    std::fs::create_dir_all("out").expect("failed to create out/");

    for frame in 0..90u32 {
        let time = frame as f32 / 30.0;

        // Sweep the beam, mirroring the entity into the projector camera
        let s = (time * 0.8 - std::f32::consts::PI).sin() * (time * 0.5 - std::f32::consts::PI).sin();
        let t = (time * 0.6 - std::f32::consts::PI).cos() * (time * 0.3 - std::f32::consts::PI).sin();
        *world.query_one_mut::<&mut Transform>(beam).unwrap() =
            Transform::from_position(Vec3::new(t * 2.0, 2.1, s * 2.0)).rotation(down);
        projectors.borrow_mut().sync_world(&world);

        queue.borrow_mut().queue_world(&world);
        graph.execute(&gpu, time, &camera, &output.view);
        queue.borrow_mut().clear_queue();

        if frame % 30 == 0 {
            let pixels = output.read_pixels(&gpu);
            let path = format!("out/animated_gobo_{:02}.png", frame);
            image::save_buffer(
                &path,
                &pixels,
                gpu.width(),
                gpu.height(),
                image::ExtendedColorType::Rgba8,
            )
            .expect("failed to save frame");
            println!("wrote {path}");
        }
    }
}
