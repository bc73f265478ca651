//! Two projectors with falloff and combine modes, rendered by layered passes.
//!
//! A perspective spot with sharp falloff shines on everything it reaches, while
//! a parallel checker beam is restricted to the floor slab. Each projector runs
//! in its own layered pass, mirroring a setup with two independent projector
//! groups. Renders one frame offscreen and saves it as a PNG.

use std::cell::RefCell;
use std::rc::Rc;

use gobo::*;

fn main() {
    env_logger::init();

    let gpu = GpuContext::headless(800, 600);

    let queue = Rc::new(RefCell::new(MeshQueue::new()));
    let depth = Rc::new(RefCell::new(DepthBuffer::new(&gpu)));

    let (ground, spot_tex, checker_tex) = {
        let mut q = queue.borrow_mut();
        let ground = q.add_mesh(Mesh::cube(&gpu, Vec3::new(2.0, 0.1, 2.0)));
        let slab = q.add_mesh(Mesh::cube(&gpu, Vec3::new(2.0, 0.1, 2.0)));
        let sphere = q.add_mesh(Mesh::sphere(&gpu, 32, 32));
        let spot_tex = q.add_texture(Texture::radial_spot(&gpu, 256, Color::ORANGE));
        let checker_tex = q.add_texture(Texture::checkerboard(
            &gpu,
            256,
            8,
            Color::rgba(1.0, 1.0, 1.0, 0.85),
            Color::TRANSPARENT,
        ));

        // Static scene: floor, a tilted slab above it, a sphere between them
        q.draw(ground, Transform::new(), Color::LIGHT_GRAY);
        q.draw(
            slab,
            Transform::from_position(Vec3::new(0.0, 3.0, 0.0))
                .rotation(Quat::from_rotation_z(-0.7)),
            Color::LIGHT_GRAY,
        );
        q.draw(
            sphere,
            Transform::from_position(Vec3::new(0.0, 0.5, 0.0)),
            Color::ORANGE,
        );

        (ground, spot_tex, checker_tex)
    };

    // Spot group: perspective projector with a tight falloff, reinforcing its
    // alpha where projections overlap
    let spots = Rc::new(RefCell::new(ProjectorSet::new()));
    spots.borrow_mut().add(
        Projector::new(
            Camera::new()
                .at(Vec3::new(1.0, 2.1, 0.0))
                .looking_at(Vec3::ZERO)
                .with_up(Vec3::X)
                .perspective(45.0, 1.0, 1.0, 5.0),
            spot_tex,
        )
        .with_falloff(Falloff::new(2.1, 4.0))
        .with_combine(CombineMode::BlendAddAlpha),
    );

    // Checker group: parallel beam straight down, floor only
    let checkers = Rc::new(RefCell::new(ProjectorSet::new()));
    checkers.borrow_mut().add(Projector::new(
        Camera::new()
            .at(Vec3::new(0.0, 2.1, 0.0))
            .looking_in(Vec3::NEG_Y)
            .with_up(Vec3::X)
            .parallel(1.5, 1.5, 1.0, 5.0),
        checker_tex,
    ));

    let mut graph = RenderGraph::builder()
        .node(
            MeshNode::new(&gpu, Rc::clone(&queue), Rc::clone(&depth))
                .with_clear(Color::rgb(0.05, 0.06, 0.1)),
        )
        .node(LayeredProjectorNode::new(
            &gpu,
            Rc::clone(&spots),
            Rc::clone(&queue),
            Rc::clone(&depth),
        ))
        .node(
            LayeredProjectorNode::new(
                &gpu,
                Rc::clone(&checkers),
                Rc::clone(&queue),
                Rc::clone(&depth),
            )
            .with_target(vec![ground]),
        )
        .build(&gpu);

    let camera = Camera::new()
        .at(Vec3::new(-1.0, 3.0, -1.0))
        .looking_at(Vec3::ZERO)
        .perspective(45.0, gpu.aspect(), 0.1, 1000.0);

    let output = RenderTarget::new(&gpu, "Output");
    graph.execute(&gpu, 0.0, &camera, &output.view);
    queue.borrow_mut().clear_queue();

    std::fs::create_dir_all("out").expect("failed to create out/");
    let pixels = output.read_pixels(&gpu);
    image::save_buffer(
        "out/layered_gobos.png",
        &pixels,
        gpu.width(),
        gpu.height(),
        image::ExtendedColorType::Rgba8,
    )
    .expect("failed to save frame");
    println!("wrote out/layered_gobos.png");
}
