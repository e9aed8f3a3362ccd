//! Marker placement.

use crate::geometry::{Matrix, Point};
use crate::log::debug;

use super::tree::{Drawable, Transform};

/// Place `node` so that it sits at `position` pointing away from
/// `reference`, measured in `target`'s coordinates (the whole tree when
/// `None`).
///
/// Any previous translation and rotation on the node is discarded; its scale
/// is kept. The node's box is centered half its width beyond `position`, so a
/// marker whose tip is on the left edge of its box ends exactly at
/// `position`. Calling this twice with the same arguments yields the same
/// transform.
pub fn translate_and_auto_orient<D: Drawable>(
    tree: &mut D,
    node: D::Node,
    position: Point,
    reference: Point,
    target: Option<D::Node>,
) {
    let (sx, sy) = tree.transform(node).scale_factors();
    let scale_only = if sx == 1.0 && sy == 1.0 {
        Transform::new()
    } else {
        Transform::new().scale(sx, sy)
    };
    tree.set_transform(node, scale_only);

    let Some(bbox) = tree.bbox(node, target) else {
        debug!(?position, "marker has no extent, leaving it in place");
        return;
    };
    let center = bbox.center();
    let to_origin = Matrix::translate(-center.x, -center.y);

    // a zero-length direction gives angle 0
    let angle = position.change_in_angle(
        position.x - reference.x,
        position.y - reference.y,
        reference,
    );
    let rotate = Matrix::rotate(angle);

    let final_position = position.move_along(reference, bbox.width / 2.0);
    let to_final = Matrix::translate(
        position.x + (position.x - final_position.x),
        position.y + (position.y - final_position.y),
    );

    let ctm = tree.transform_to(node, target);
    let d = (to_final * rotate * to_origin * ctm).decompose();

    let mut transform = Transform::new()
        .translate(d.translate_x, d.translate_y)
        .rotate(d.rotation, 0.0, 0.0);
    if sx != 1.0 || sy != 1.0 {
        transform = transform.scale(sx, sy);
    }
    tree.set_transform(node, transform);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::pt;
    use crate::view::defaults::MARKER_MARKUP;
    use crate::view::tree::VTree;

    fn marker(tree: &mut VTree) -> crate::view::tree::NodeId {
        let node = tree.create("path");
        tree.set_attr(node, "d", MARKER_MARKUP);
        let root = tree.root();
        tree.append(root, node);
        node
    }

    #[test]
    fn test_source_marker_points_at_its_end() {
        let mut tree = VTree::new();
        let node = marker(&mut tree);
        translate_and_auto_orient(&mut tree, node, pt(100.0, 30.0), pt(300.0, 30.0), None);
        insta::assert_snapshot!(tree.transform(node).to_string(), @"translate(100,25) rotate(0)");
        // the tip of the arrow lands on the connection point
        let tip = tree.transform(node).to_matrix().apply(pt(0.0, 5.0));
        assert!(tip.distance(pt(100.0, 30.0)) < 1e-9);
    }

    #[test]
    fn test_target_marker_is_turned_around() {
        let mut tree = VTree::new();
        let node = marker(&mut tree);
        translate_and_auto_orient(&mut tree, node, pt(300.0, 30.0), pt(100.0, 30.0), None);
        let tip = tree.transform(node).to_matrix().apply(pt(0.0, 5.0));
        assert!(tip.distance(pt(300.0, 30.0)) < 1e-9);
        let back = tree.transform(node).to_matrix().apply(pt(10.0, 5.0));
        assert!(back.distance(pt(290.0, 30.0)) < 1e-9);
    }

    #[test]
    fn test_idempotent() {
        let mut tree = VTree::new();
        let node = marker(&mut tree);
        translate_and_auto_orient(&mut tree, node, pt(40.0, 40.0), pt(90.0, 120.0), None);
        let first = tree.transform(node);
        translate_and_auto_orient(&mut tree, node, pt(40.0, 40.0), pt(90.0, 120.0), None);
        let second = tree.transform(node);
        let (a, b) = (first.to_matrix().coefficients(), second.to_matrix().coefficients());
        assert!(a.iter().zip(b.iter()).all(|(x, y)| (x - y).abs() < 1e-9));
    }

    #[test]
    fn test_keeps_scale() {
        let mut tree = VTree::new();
        let node = marker(&mut tree);
        tree.set_transform(node, Transform::new().translate(3.0, 3.0).scale(0.5, 0.5));
        translate_and_auto_orient(&mut tree, node, pt(100.0, 30.0), pt(300.0, 30.0), None);
        assert_eq!(tree.transform(node).scale_factors(), (0.5, 0.5));
        let tip = tree.transform(node).to_matrix().apply(pt(0.0, 5.0));
        assert!(tip.distance(pt(100.0, 30.0)) < 1e-9);
    }

    #[test]
    fn test_zero_length_direction_uses_angle_zero() {
        let mut tree = VTree::new();
        let node = marker(&mut tree);
        translate_and_auto_orient(&mut tree, node, pt(10.0, 10.0), pt(10.0, 10.0), None);
        let d = tree.transform(node).to_matrix().decompose();
        assert!(d.rotation.abs() < 1e-9);
    }
}
