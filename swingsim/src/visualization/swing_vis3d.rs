use bevy::prelude::*;
use bevy::math::primitives::Sphere;

use crate::simulation::attachment::PivotRequest;
use crate::simulation::scenario::Scenario;
use crate::simulation::states::NVec3;

/// The scenario as a bevy resource; physics only touches it in `FixedUpdate`
#[derive(Resource)]
struct SwingScenario(Scenario);

/// Component tagging the bob sphere
#[derive(Component)]
struct BobMarker;

/// Component tagging each anchor sphere with its index into the anchor list
#[derive(Component)]
struct AnchorIndex(pub usize);

/// World-space → screen-space scaling factor for positions
const SCALE3D: f32 = 50.0;

/// Distance of the camera from the scene along +Z
const CAMERA_DISTANCE: f32 = 1500.0;

/// Length of a force ray per unit of force
const RAY_SCALE: f32 = 0.3;

const BOB_RADIUS: f32 = 0.2 * SCALE3D;
const ANCHOR_RADIUS: f32 = 0.1 * SCALE3D;

fn to_screen(v: &NVec3) -> Vec3 {
    Vec3::new(v.x as f32, v.y as f32, v.z as f32) * SCALE3D
}

fn to_ray(v: &NVec3) -> Vec3 {
    Vec3::new(v.x as f32, v.y as f32, v.z as f32) * RAY_SCALE * SCALE3D
}

/// Open a window and run the scenario at its fixed tick
///
/// Space / Right arrow: swing to the next anchor, R: reset, P: pause
pub fn run_3d(scenario: Scenario) {
    let h0 = scenario.parameters().h0;
    info!("run_3d: starting Bevy 3D viewer with {} anchors, tick {h0} s", scenario.anchors().len());

    App::new()
        .insert_resource(Time::<Fixed>::from_seconds(h0))
        .insert_resource(SwingScenario(scenario))
        // the binary already installed a tracing subscriber
        .add_plugins(DefaultPlugins.build().disable::<bevy::log::LogPlugin>())
        .add_systems(Startup, setup_3d)
        .add_systems(FixedUpdate, physics_step_3d)
        .add_systems(Update, (input_3d, sync_transforms_3d, draw_forces_3d))
        .run();
}

/// Startup system: spawn camera, light, one sphere per anchor and the bob
fn setup_3d(mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    scenario: Res<SwingScenario>,
) {
    let sc = &scenario.0;

    // Look at the middle of the anchor row
    let centre = sc.anchors().iter().map(|a| to_screen(&a.x)).sum::<Vec3>() / sc.anchors().len().max(1) as f32;

    commands.spawn(Camera3dBundle {
        camera: Camera {
            clear_color: ClearColorConfig::Custom(Color::srgb(0.0, 0.0, 0.0)),
            ..Default::default()
        },
        transform: Transform::from_xyz(centre.x, centre.y, CAMERA_DISTANCE)
            .looking_at(centre, Vec3::Y),
        ..Default::default()
    });

    commands.spawn(PointLightBundle {
        point_light: PointLight {
            intensity: 1500.0,
            range: 2000.0,
            ..Default::default()
        },
        transform: Transform::from_xyz(centre.x, centre.y + 100.0, CAMERA_DISTANCE),
        ..Default::default()
    });

    for (i, a) in sc.anchors().iter().enumerate() {
        commands.spawn((
            PbrBundle {
                mesh: meshes.add(Sphere::new(ANCHOR_RADIUS).mesh()),
                material: materials.add(StandardMaterial {
                    base_color: Color::srgb(0.5, 0.0, 0.5),
                    unlit: true,
                    ..Default::default()
                }),
                transform: Transform::from_translation(to_screen(&a.x)),
                ..Default::default()
            },
            AnchorIndex(i),
        ));
    }

    commands.spawn((
        PbrBundle {
            mesh: meshes.add(Sphere::new(BOB_RADIUS).mesh()),
            material: materials.add(StandardMaterial {
                base_color: Color::srgb(1.0, 1.0, 1.0),
                unlit: true,
                ..Default::default()
            }),
            transform: Transform::from_translation(to_screen(&sc.position())),
            ..Default::default()
        },
        BobMarker,
    ));
}

/// Fixed-rate physics tick, scripted commands included
fn physics_step_3d(mut scenario: ResMut<SwingScenario>) {
    if let Err(e) = scenario.0.tick() {
        error!("physics_step_3d: {e}");
    }
}

/// Keyboard → host commands
fn input_3d(keys: Res<ButtonInput<KeyCode>>, mut scenario: ResMut<SwingScenario>) {
    let sc = &mut scenario.0;

    if keys.just_pressed(KeyCode::Space) || keys.just_pressed(KeyCode::ArrowRight) {
        match sc.request_pivot_change(PivotRequest::Next) {
            Ok(Some(_)) => info!("swinging to anchor {}", sc.pivot_index()),
            Ok(None) => {}
            Err(e) => error!("pivot change: {e}"),
        }
    }

    if keys.just_pressed(KeyCode::KeyR) {
        if let Err(e) = sc.reset() {
            error!("reset: {e}");
        }
    }

    if keys.just_pressed(KeyCode::KeyP) {
        let paused = !sc.is_paused();
        sc.set_paused(paused);
    }
}

fn sync_transforms_3d(
    scenario: Res<SwingScenario>,
    mut bob_query: Query<&mut Transform, With<BobMarker>>,
    mut anchor_query: Query<(&AnchorIndex, &mut Transform), Without<BobMarker>>,
) {
    let sc = &scenario.0;

    for mut transform in &mut bob_query {
        transform.translation = to_screen(&sc.position());
    }

    for (AnchorIndex(i), mut transform) in &mut anchor_query {
        if let Some(a) = sc.anchors().get(*i) {
            transform.translation = to_screen(&a.x);
        }
    }
}

/// Debug rays
///
/// - White: tether
/// - Yellow: gravity
/// - Orange: tension
/// - Red: resulting force
fn draw_forces_3d(scenario: Res<SwingScenario>, mut gizmos: Gizmos) {
    let sc = &scenario.0;
    let bob = to_screen(&sc.position());
    let sample = sc.diagnostics();

    if let Some(tether) = sc.tether() {
        gizmos.line(to_screen(&tether.pivot), bob, Color::srgb(0.85, 0.95, 0.9));
    }

    gizmos.ray(bob, to_ray(&sample.gravity_force), Color::srgb(1.0, 1.0, 0.1));

    if sample.is_taut {
        gizmos.ray(bob, to_ray(&sample.tension_vector()), Color::srgb(1.0, 0.5, 0.2));
    }

    gizmos.ray(bob, to_ray(&sample.resultant()), Color::srgb(1.0, 0.3, 0.3));
}
