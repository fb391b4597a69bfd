// =============================================================================
// hop demo - a ball bouncing around a small scene
// =============================================================================
//
// Arrow keys move the paddle, space changes the ball color, M mirrors the
// house. ESC quits and F11 toggles fullscreen (see [controls] in config.toml).

use anyhow::Result;
use hop::{Color, Game, Key, Vec2, BLUE, GREEN, RED, WHITE};

const PADDLE_SPEED: f32 = 6.0;

fn main() -> Result<()> {
    let mut game = Game::new("hop demo");
    log::info!("Starting hop demo");

    game.set_window_size(800, 600)?;
    game.start()?;
    let (width, height) = game.window_size();
    if let Ok((w, h)) = game.resolution() {
        log::info!("Monitor resolution: {}x{}", w, h);
    }

    // Scenery
    game.create_rectangle(0.0, 0.0, width as f32, 40.0, GREEN)?;
    game.create_text(20.0, height as f32 - 60.0, 2, WHITE, "Hop!")?;

    let mut house = game.create_group(500.0, 40.0, 120.0, 140.0);
    house.create_rectangle(game.scene_mut(), 10.0, 0.0, 100.0, 80.0, Color::rgb(0.8, 0.6, 0.3))?;
    house.create_rectangle(game.scene_mut(), 20.0, 0.0, 25.0, 45.0, Color::rgb(0.4, 0.2, 0.1))?;
    house.create_triangle(
        game.scene_mut(),
        Vec2::new(0.0, 80.0),
        Vec2::new(120.0, 80.0),
        Vec2::new(60.0, 140.0),
        RED,
    )?;

    let paddle = game.create_rectangle(40.0, 60.0, 100.0, 15.0, WHITE)?;
    let ball = game.create_circle(200.0, 300.0, 12.0, BLUE)?;
    let mut velocity = Vec2::new(4.0, -3.0);

    // Missing sounds are logged and the demo stays silent
    let mut bounce = game.create_sound("bounce.wav", false).ok();

    for name in ["left", "right", "space", "m"] {
        game.monitor_key(name)?;
    }
    game.bind_key("r", |ctx| {
        for id in ctx.scene.iter().map(|o| o.id()).collect::<Vec<_>>() {
            if let Err(e) = ctx.scene.set_color(id, Color::rgb(0.5, 0.5, 0.5)) {
                log::warn!("Could not recolor {:?}: {}", id, e);
            }
        }
    })?;

    while game.is_running() {
        game.update();
        if !game.is_running() {
            break;
        }

        if game.key_held(Key::Left) || game.key_pressed(Key::Left) {
            game.move_object(paddle, -PADDLE_SPEED, 0.0)?;
        }
        if game.key_held(Key::Right) || game.key_pressed(Key::Right) {
            game.move_object(paddle, PADDLE_SPEED, 0.0)?;
        }
        if game.key_pressed(Key::Space) {
            game.set_color(ball, RED)?;
        }
        if game.key_released(Key::Space) {
            game.set_color(ball, BLUE)?;
        }
        if game.key_pressed(Key::M) {
            house.flip(game.scene_mut());
        }

        game.move_object(ball, velocity.x, velocity.y)?;
        let (w, h) = game.window_size();
        let bounds = game.scene().bounds(ball)?;
        let hit_wall = bounds.x < 0.0 || bounds.x + bounds.width > w as f32;
        let hit_roof = bounds.y + bounds.height > h as f32;
        let hit_paddle = velocity.y < 0.0 && game.collides(ball, paddle)?;
        if hit_wall {
            velocity.x = -velocity.x;
        }
        if hit_roof || hit_paddle || bounds.y < 0.0 {
            velocity.y = -velocity.y;
            if let Some(sound) = bounce.as_mut() {
                if let Err(e) = sound.play() {
                    log::warn!("Bounce sound failed: {}", e);
                }
            }
        }
    }

    log::info!("Bye");
    Ok(())
}
