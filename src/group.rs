// Group - a compound picture built out of shapes
//
// Shapes are placed relative to the group's bottom-left corner and must fit
// inside its width/height. Groups nest: a child group is moved into place
// when it is added and from then on follows its parent.

use crate::color::Color;
use crate::error::{at_least, HopError, HopResult};
use crate::geometry::Rect;
use crate::scene::{ObjectId, Scene};
use glam::Vec2;

#[derive(Debug, Clone, Default)]
pub struct Group {
    x: f32,
    y: f32,
    width: f32,
    height: f32,
    objects: Vec<ObjectId>,
    children: Vec<Group>,
}

impl Group {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        if width < 1.0 || height < 1.0 {
            log::warn!(
                "Group::new: size {}x{} is smaller than 1 pixel, nothing will fit",
                width,
                height
            );
        }

        Self {
            x,
            y,
            width,
            height,
            ..Default::default()
        }
    }

    pub fn x(&self) -> f32 {
        self.x
    }

    pub fn y(&self) -> f32 {
        self.y
    }

    pub fn width(&self) -> f32 {
        self.width
    }

    pub fn height(&self) -> f32 {
        self.height
    }

    /// World-space area covered by the group.
    pub fn bounds(&self) -> Rect {
        Rect::new(self.x, self.y, self.width, self.height)
    }

    /// Objects created directly in this group (not in nested groups).
    pub fn objects(&self) -> &[ObjectId] {
        &self.objects
    }

    pub fn children(&self) -> &[Group] {
        &self.children
    }

    /// Every object in this group and its nested groups.
    pub fn all_objects(&self) -> Vec<ObjectId> {
        let mut out = self.objects.clone();
        for child in &self.children {
            out.extend(child.all_objects());
        }
        out
    }

    fn local_bounds(&self) -> Rect {
        Rect::new(0.0, 0.0, self.width, self.height)
    }

    fn check_inside(&self, area: Rect, what: &'static str) -> HopResult<()> {
        if self.local_bounds().contains_rect(&area) {
            Ok(())
        } else {
            Err(HopError::OutOfBounds { what })
        }
    }

    pub fn create_rectangle(
        &mut self,
        scene: &mut Scene,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        color: Color,
    ) -> HopResult<ObjectId> {
        at_least("rectangle width", width, 1.0)?;
        at_least("rectangle height", height, 1.0)?;
        self.check_inside(Rect::new(x, y, width, height), "rectangle")?;

        let id = scene.add_rectangle(self.x + x, self.y + y, width, height, color);
        self.objects.push(id);
        Ok(id)
    }

    /// Circle centered on `(x, y)` relative to the group corner.
    pub fn create_circle(
        &mut self,
        scene: &mut Scene,
        x: f32,
        y: f32,
        radius: f32,
        color: Color,
    ) -> HopResult<ObjectId> {
        at_least("circle radius", radius, 1.0)?;
        self.check_inside(
            Rect::new(x - radius, y - radius, radius * 2.0, radius * 2.0),
            "circle",
        )?;

        let id = scene.add_circle(self.x + x, self.y + y, radius, color);
        self.objects.push(id);
        Ok(id)
    }

    pub fn create_triangle(
        &mut self,
        scene: &mut Scene,
        a: Vec2,
        b: Vec2,
        c: Vec2,
        color: Color,
    ) -> HopResult<ObjectId> {
        self.check_inside(Rect::from_points(&[a, b, c]), "triangle")?;

        let origin = Vec2::new(self.x, self.y);
        let id = scene.add_triangle(a + origin, b + origin, c + origin, color);
        self.objects.push(id);
        Ok(id)
    }

    /// Adopts `child`, moving it (and everything in it) to `(x, y)` relative
    /// to this group.
    pub fn add_group(&mut self, scene: &mut Scene, x: f32, y: f32, mut child: Group) -> HopResult<()> {
        self.check_inside(Rect::new(x, y, child.width, child.height), "group")?;

        child.move_by(scene, self.x + x - child.x, self.y + y - child.y);
        self.children.push(child);
        Ok(())
    }

    pub fn set_color_all(&self, scene: &mut Scene, color: Color) {
        for &id in &self.objects {
            if let Some(obj) = scene.get_mut(id) {
                obj.set_color(color);
            }
        }
        for child in &self.children {
            child.set_color_all(scene, color);
        }
    }

    pub fn move_by(&mut self, scene: &mut Scene, dx: f32, dy: f32) {
        for &id in &self.objects {
            if let Some(obj) = scene.get_mut(id) {
                obj.translate(dx, dy);
            }
        }
        for child in &mut self.children {
            child.move_by(scene, dx, dy);
        }
        self.x += dx;
        self.y += dy;
    }

    /// Mirrors the whole group left to right across its vertical center line.
    pub fn flip(&mut self, scene: &mut Scene) {
        let axis = self.x * 2.0 + self.width;

        for &id in &self.objects {
            if let Some(obj) = scene.get_mut(id) {
                let bounds = obj.bounds();
                let mirrored_x = axis - (bounds.x + bounds.width);
                obj.translate(mirrored_x - bounds.x, 0.0);
                obj.mirror_horizontal();
            }
        }

        for child in &mut self.children {
            let mirrored_x = axis - (child.x + child.width);
            child.move_by(scene, mirrored_x - child.x, 0.0);
            child.flip(scene);
        }
    }

    /// Removes every object of the group from the scene.
    pub fn destroy(self, scene: &mut Scene) {
        for id in self.all_objects() {
            scene.remove(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::{BLACK, GREEN, WHITE};

    fn bunny(scene: &mut Scene) -> Group {
        let mut g = Group::new(30.0, 975.0, 90.0, 100.0);
        g.create_rectangle(scene, 64.0, 75.0, 6.0, 15.0, WHITE).unwrap();
        g.create_rectangle(scene, 75.0, 55.0, 5.0, 10.0, BLACK).unwrap();
        g.create_circle(scene, 10.0, 25.0, 10.0, WHITE).unwrap();
        g
    }

    #[test]
    fn shapes_are_placed_relative_to_group() {
        let mut scene = Scene::new();
        let g = bunny(&mut scene);
        let ear = g.objects()[0];
        assert_eq!(scene.bounds(ear).unwrap(), Rect::new(94.0, 1050.0, 6.0, 15.0));
    }

    #[test]
    fn rejects_shapes_outside_boundary() {
        let mut scene = Scene::new();
        let mut g = Group::new(0.0, 0.0, 16.0, 20.0);
        assert!(matches!(
            g.create_rectangle(&mut scene, 12.0, 0.0, 8.0, 4.0, GREEN),
            Err(HopError::OutOfBounds { what: "rectangle" })
        ));
        assert!(matches!(
            g.create_circle(&mut scene, 2.0, 10.0, 5.0, GREEN),
            Err(HopError::OutOfBounds { what: "circle" })
        ));
        assert!(g
            .create_triangle(
                &mut scene,
                Vec2::new(-1.0, 0.0),
                Vec2::new(4.0, 0.0),
                Vec2::new(2.0, 4.0),
                GREEN
            )
            .is_err());
        assert!(scene.is_empty());
        assert!(g.objects().is_empty());
    }

    #[test]
    fn rejects_degenerate_sizes() {
        let mut scene = Scene::new();
        let mut g = Group::new(0.0, 0.0, 100.0, 100.0);
        assert!(matches!(
            g.create_rectangle(&mut scene, 0.0, 0.0, 0.0, 5.0, GREEN),
            Err(HopError::TooSmall { what: "rectangle width", .. })
        ));
        assert!(matches!(
            g.create_circle(&mut scene, 50.0, 50.0, 0.5, GREEN),
            Err(HopError::TooSmall { what: "circle radius", .. })
        ));
    }

    #[test]
    fn move_by_moves_nested_groups() {
        let mut scene = Scene::new();
        let mut parent = Group::new(0.0, 0.0, 200.0, 200.0);
        let mut child = Group::new(500.0, 500.0, 20.0, 20.0);
        let dot = child.create_rectangle(&mut scene, 0.0, 0.0, 5.0, 5.0, GREEN).unwrap();

        parent.add_group(&mut scene, 10.0, 20.0, child).unwrap();
        assert_eq!(scene.bounds(dot).unwrap().min(), Vec2::new(10.0, 20.0));

        parent.move_by(&mut scene, 5.0, -5.0);
        assert_eq!(scene.bounds(dot).unwrap().min(), Vec2::new(15.0, 15.0));
        assert_eq!(parent.children()[0].x(), 15.0);
        assert_eq!(parent.all_objects(), vec![dot]);
    }

    #[test]
    fn add_group_rejects_oversized_child() {
        let mut scene = Scene::new();
        let mut parent = Group::new(0.0, 0.0, 50.0, 50.0);
        let child = Group::new(0.0, 0.0, 40.0, 40.0);
        assert!(parent.add_group(&mut scene, 20.0, 0.0, child).is_err());
        assert!(parent.children().is_empty());
    }

    #[test]
    fn flip_mirrors_across_center() {
        let mut scene = Scene::new();
        let mut g = bunny(&mut scene);
        let ear = g.objects()[0];
        g.flip(&mut scene);
        // local x 64..70 in a 90 wide group mirrors to 20..26
        assert_eq!(scene.bounds(ear).unwrap(), Rect::new(50.0, 1050.0, 6.0, 15.0));
        assert_eq!(g.x(), 30.0);

        g.flip(&mut scene);
        assert_eq!(scene.bounds(ear).unwrap(), Rect::new(94.0, 1050.0, 6.0, 15.0));
    }

    #[test]
    fn flip_mirrors_nested_groups() {
        let mut scene = Scene::new();
        let mut parent = Group::new(0.0, 0.0, 100.0, 50.0);
        let mut child = Group::new(0.0, 0.0, 20.0, 20.0);
        let dot = child.create_rectangle(&mut scene, 0.0, 0.0, 5.0, 5.0, GREEN).unwrap();
        parent.add_group(&mut scene, 10.0, 0.0, child).unwrap();

        parent.flip(&mut scene);
        // child 10..30 lands on 70..90, the dot on its far side
        assert_eq!(parent.children()[0].x(), 70.0);
        assert_eq!(scene.bounds(dot).unwrap(), Rect::new(85.0, 0.0, 5.0, 5.0));

        parent.flip(&mut scene);
        assert_eq!(parent.children()[0].x(), 10.0);
        assert_eq!(scene.bounds(dot).unwrap(), Rect::new(10.0, 0.0, 5.0, 5.0));
    }

    #[test]
    fn set_color_all_reaches_children() {
        let mut scene = Scene::new();
        let mut parent = Group::new(0.0, 0.0, 100.0, 100.0);
        let mut child = Group::new(0.0, 0.0, 10.0, 10.0);
        let inner = child.create_rectangle(&mut scene, 0.0, 0.0, 2.0, 2.0, WHITE).unwrap();
        parent.add_group(&mut scene, 0.0, 0.0, child).unwrap();
        let outer = parent.create_rectangle(&mut scene, 50.0, 50.0, 2.0, 2.0, WHITE).unwrap();

        parent.set_color_all(&mut scene, GREEN);
        assert_eq!(scene.get(inner).unwrap().color(), GREEN);
        assert_eq!(scene.get(outer).unwrap().color(), GREEN);
    }

    #[test]
    fn destroy_removes_objects() {
        let mut scene = Scene::new();
        let g = bunny(&mut scene);
        assert_eq!(scene.len(), 3);
        g.destroy(&mut scene);
        assert!(scene.is_empty());
    }
}
