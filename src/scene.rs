// Scene - CPU-side store of everything that gets drawn
//
// Objects are kept in creation order, which is also draw order. The renderer
// never owns geometry: it mirrors objects into GPU buffers and re-uploads
// whenever an object's revision changes.

use crate::color::Color;
use crate::error::{HopError, HopResult};
use crate::geometry::{self, Rect};
use glam::Vec2;

/// Handle to an object in a [`Scene`]. Ids are never reused.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(u64);

impl ObjectId {
    pub fn raw(self) -> u64 {
        self.0
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ShapeKind {
    Rectangle,
    Circle,
    Triangle,
}

#[derive(Debug, Clone)]
pub struct Object {
    id: ObjectId,
    kind: ShapeKind,
    vertices: Vec<Vec2>,
    translation: Vec2,
    color: Color,
    /// Bumped whenever `vertices` change so the renderer knows to re-upload.
    revision: u64,
}

impl Object {
    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn kind(&self) -> ShapeKind {
        self.kind
    }

    pub fn vertices(&self) -> &[Vec2] {
        &self.vertices
    }

    pub fn translation(&self) -> Vec2 {
        self.translation
    }

    pub fn color(&self) -> Color {
        self.color
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// World-space bounding box.
    pub fn bounds(&self) -> Rect {
        Rect::from_points(&self.vertices).translated(self.translation)
    }

    pub fn translate(&mut self, dx: f32, dy: f32) {
        self.translation += Vec2::new(dx, dy);
    }

    /// Moves the object so its bounding box starts at `(x, y)`.
    pub fn set_position(&mut self, x: f32, y: f32) {
        let bounds = self.bounds();
        self.translate(x - bounds.x, y - bounds.y);
    }

    pub fn set_color(&mut self, color: Color) {
        self.color = color;
    }

    /// Mirrors the geometry left to right in place; the bounding box stays put.
    pub fn mirror_horizontal(&mut self) {
        let local = Rect::from_points(&self.vertices);
        let axis = local.x * 2.0 + local.width;
        for v in &mut self.vertices {
            v.x = axis - v.x;
        }
        self.revision += 1;
    }
}

#[derive(Debug, Default)]
pub struct Scene {
    objects: Vec<Object>,
    next_id: u64,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(&mut self, kind: ShapeKind, vertices: Vec<Vec2>, translation: Vec2, color: Color) -> ObjectId {
        let id = ObjectId(self.next_id);
        self.next_id += 1;

        log::trace!("scene: add {:?} {:?} at {:?}", kind, id, translation);
        self.objects.push(Object {
            id,
            kind,
            vertices,
            translation,
            color,
            revision: 0,
        });
        id
    }

    /// Axis-aligned rectangle with its bottom-left corner at `(x, y)`.
    pub fn add_rectangle(&mut self, x: f32, y: f32, width: f32, height: f32, color: Color) -> ObjectId {
        self.insert(
            ShapeKind::Rectangle,
            geometry::rectangle_vertices(width, height),
            Vec2::new(x, y),
            color,
        )
    }

    /// Circle centered on `(x, y)`.
    pub fn add_circle(&mut self, x: f32, y: f32, radius: f32, color: Color) -> ObjectId {
        self.insert(
            ShapeKind::Circle,
            geometry::circle_vertices(radius),
            Vec2::new(x, y),
            color,
        )
    }

    /// Triangle from three world-space points. The translation is the
    /// bounding box corner so moves behave like every other shape.
    pub fn add_triangle(&mut self, a: Vec2, b: Vec2, c: Vec2, color: Color) -> ObjectId {
        let origin = Rect::from_points(&[a, b, c]).min();
        self.insert(
            ShapeKind::Triangle,
            geometry::triangle_vertices(a - origin, b - origin, c - origin),
            origin,
            color,
        )
    }

    pub fn get(&self, id: ObjectId) -> Option<&Object> {
        // Ids are handed out in increasing order and objects stay sorted.
        self.objects
            .binary_search_by_key(&id, |o| o.id)
            .ok()
            .map(|i| &self.objects[i])
    }

    pub fn get_mut(&mut self, id: ObjectId) -> Option<&mut Object> {
        self.objects
            .binary_search_by_key(&id, |o| o.id)
            .ok()
            .map(|i| &mut self.objects[i])
    }

    fn require_mut(&mut self, id: ObjectId) -> HopResult<&mut Object> {
        self.get_mut(id).ok_or(HopError::UnknownObject(id))
    }

    pub fn remove(&mut self, id: ObjectId) -> Option<Object> {
        let index = self.objects.binary_search_by_key(&id, |o| o.id).ok()?;
        Some(self.objects.remove(index))
    }

    pub fn move_object(&mut self, id: ObjectId, dx: f32, dy: f32) -> HopResult<()> {
        self.require_mut(id)?.translate(dx, dy);
        Ok(())
    }

    pub fn set_color(&mut self, id: ObjectId, color: Color) -> HopResult<()> {
        self.require_mut(id)?.set_color(color);
        Ok(())
    }

    pub fn bounds(&self, id: ObjectId) -> HopResult<Rect> {
        self.get(id).map(Object::bounds).ok_or(HopError::UnknownObject(id))
    }

    /// Bounding-box collision between two objects.
    pub fn collides(&self, a: ObjectId, b: ObjectId) -> HopResult<bool> {
        Ok(self.bounds(a)?.intersects(&self.bounds(b)?))
    }

    /// Objects in draw order.
    pub fn iter(&self) -> impl Iterator<Item = &Object> {
        self.objects.iter()
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn clear(&mut self) {
        self.objects.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::{BLUE, RED, WHITE};

    #[test]
    fn ids_are_unique_and_ordered() {
        let mut scene = Scene::new();
        let a = scene.add_rectangle(0.0, 0.0, 10.0, 10.0, RED);
        let b = scene.add_circle(50.0, 50.0, 5.0, BLUE);
        assert!(a < b);
        assert_eq!(scene.len(), 2);

        scene.remove(a);
        let c = scene.add_rectangle(0.0, 0.0, 1.0, 1.0, RED);
        assert_ne!(a, c);
        assert!(scene.get(a).is_none());
        assert!(scene.get(c).is_some());
    }

    #[test]
    fn draw_order_is_creation_order() {
        let mut scene = Scene::new();
        let ids: Vec<_> = (0..4)
            .map(|i| scene.add_rectangle(i as f32, 0.0, 1.0, 1.0, WHITE))
            .collect();
        let order: Vec<_> = scene.iter().map(Object::id).collect();
        assert_eq!(order, ids);
    }

    #[test]
    fn rectangle_bounds_follow_moves() {
        let mut scene = Scene::new();
        let paddle = scene.add_rectangle(50.0, 480.0, 20.0, 120.0, BLUE);
        scene.move_object(paddle, 0.0, 10.0).unwrap();
        assert_eq!(scene.bounds(paddle).unwrap(), Rect::new(50.0, 490.0, 20.0, 120.0));
    }

    #[test]
    fn circle_is_centered_on_position() {
        let mut scene = Scene::new();
        let tail = scene.add_circle(20.0, 990.0, 10.0, WHITE);
        let b = scene.bounds(tail).unwrap();
        assert!((b.x - 10.0).abs() < 1e-3);
        assert!((b.y - 980.0).abs() < 1e-3);
        assert!((b.width - 20.0).abs() < 1e-3);
    }

    #[test]
    fn triangle_keeps_world_positions() {
        let mut scene = Scene::new();
        let id = scene.add_triangle(
            Vec2::new(920.0, 1020.0),
            Vec2::new(850.0, 960.0),
            Vec2::new(940.0, 980.0),
            RED,
        );
        let obj = scene.get(id).unwrap();
        assert_eq!(obj.translation(), Vec2::new(850.0, 960.0));
        let world: Vec<_> = obj.vertices().iter().map(|v| *v + obj.translation()).collect();
        assert_eq!(world[0], Vec2::new(920.0, 1020.0));
        assert_eq!(obj.bounds(), Rect::new(850.0, 960.0, 90.0, 60.0));
    }

    #[test]
    fn collision_between_objects() {
        let mut scene = Scene::new();
        let body = scene.add_rectangle(30.0, 980.0, 70.0, 50.0, WHITE);
        let far = scene.add_rectangle(500.0, 0.0, 10.0, 10.0, WHITE);
        let near = scene.add_triangle(
            Vec2::new(90.0, 1000.0),
            Vec2::new(120.0, 1000.0),
            Vec2::new(110.0, 1040.0),
            RED,
        );
        assert!(scene.collides(body, near).unwrap());
        assert!(!scene.collides(body, far).unwrap());
    }

    #[test]
    fn unknown_object_is_an_error() {
        let mut scene = Scene::new();
        let id = scene.add_rectangle(0.0, 0.0, 1.0, 1.0, RED);
        scene.remove(id);
        assert!(matches!(scene.move_object(id, 1.0, 1.0), Err(HopError::UnknownObject(_))));
        assert!(scene.collides(id, id).is_err());
    }

    #[test]
    fn set_position_moves_bounding_box_corner() {
        let mut scene = Scene::new();
        let id = scene.add_circle(100.0, 100.0, 10.0, RED);
        let obj = scene.get_mut(id).unwrap();
        obj.set_position(0.0, 0.0);
        let b = obj.bounds();
        assert!(b.x.abs() < 1e-3 && b.y.abs() < 1e-3);
    }

    #[test]
    fn mirror_keeps_bounds_and_bumps_revision() {
        let mut scene = Scene::new();
        let id = scene.add_triangle(
            Vec2::new(0.0, 0.0),
            Vec2::new(10.0, 0.0),
            Vec2::new(0.0, 10.0),
            RED,
        );
        let obj = scene.get_mut(id).unwrap();
        let before = obj.bounds();
        obj.mirror_horizontal();
        assert_eq!(obj.bounds(), before);
        assert_eq!(obj.revision(), 1);
        assert!(obj.vertices().contains(&Vec2::new(10.0, 10.0)));
    }
}
