//! A small demo scene: bouncing balls, a spinner, gems, and a player.
//!
//! Move with WASD, pause with `p`, quit with `q` or Escape. Gems vanish when
//! the player touches them; the wall blocks.

#![deny(unused)]

use std::collections::HashSet;

use rand::Rng;

use caper::actor::ActorSpec;
use caper::app::App;
use caper::app::Flow;
use caper::gfx::color;
use caper::gfx::curses::Curses;
use caper::gfx::curses::KeyCode;
use caper::stage::Config;
use caper::stage::Verdict;

fn main() {
  let backend = Curses::init();
  let mut app = App::new(backend, Config::default());

  let stage = app.stage_mut();
  stage.set_border(true);

  let mut rng = rand::thread_rng();
  for _ in 0..5 {
    let mut ball = ActorSpec::of("o");
    ball.pos = (rng.gen_range(2.0..20.0), rng.gen_range(2.0..10.0));
    ball.vel = (rng.gen_range(-8.0..8.0), rng.gen_range(-4.0..4.0));
    ball.fg = Some(color::nearest(color::colors::GOLD));
    ball.bordered = true;
    ball.collides = false;
    stage.spawn(ball).unwrap();
  }

  let mut spinner = ActorSpec::animated(&["|", "/", "-", "\\"]);
  spinner.pos = (30.0, 8.0);
  spinner.frame_rate = 8.0;
  spinner.collides = false;
  spinner.fg = Some(color::nearest(color::colors::CYAN));
  stage.spawn(spinner).unwrap();

  let mut gems = HashSet::new();
  for i in 0..3 {
    let mut gem = ActorSpec::of("*");
    gem.pos = (8.0 + 6.0 * i as f64, 5.0);
    gem.fg = Some(color::nearest(color::colors::ORCHID));
    gems.insert(stage.spawn(gem).unwrap());
  }

  let mut wall = ActorSpec::of("##\n##");
  wall.pos = (24.0, 6.0);
  wall.fg = Some(color::nearest(color::colors::GRAY));
  stage.spawn(wall).unwrap();

  let mut player = ActorSpec::of("@");
  player.pos = (4.0, 4.0);
  player.bordered = true;
  player.fg = Some(color::nearest(color::colors::WHITE));
  let player_id = stage.spawn(player).unwrap();

  // Gems are collected on contact; everything else blocks the move.
  stage.collision_hook(move |stage, _mover, other, _cells| {
    if gems.contains(&other) {
      stage.destroy(other);
      Verdict::Pass
    } else {
      Verdict::Block
    }
  });

  let dirs = [
    (KeyCode::Char('a'), (-1.0, 0.0)),
    (KeyCode::Char('d'), (1.0, 0.0)),
    (KeyCode::Char('w'), (0.0, -1.0)),
    (KeyCode::Char('s'), (0.0, 1.0)),
  ];
  for &(code, (dx, dy)) in dirs.iter() {
    app.on_key(code, move |stage| {
      if let Some(player) = stage.actor(player_id) {
        let pos = player.pos();
        stage.move_to(player_id, pos.x() + dx, pos.y() + dy);
      }
      Ok(Flow::Continue)
    });
  }

  app.on_key(KeyCode::Char('p'), |stage| {
    if stage.paused() {
      stage.resume()
    } else {
      stage.pause()
    }
    Ok(Flow::Continue)
  });
  app.on_key(KeyCode::Char('q'), |_| Ok(Flow::Exit));
  app.on_key(KeyCode::Esc, |_| Ok(Flow::Exit));

  app.run().unwrap();
}
