use worldpart_common::{LivingEntity, Relation};

/// Which living entities a targeting query accepts, judged from the
/// origin's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RelationFilter {
    #[default]
    Any,
    /// Only entities the origin holds this relation towards.
    Relation(Relation),
    /// Only entities the origin's aggro towards is at most this value.
    AggroAtMost(i32),
}

impl RelationFilter {
    /// Relation and aggro filters reject everything when the origin is not
    /// a living entity.
    pub fn accepts(&self, origin: Option<&dyn LivingEntity>, candidate: &dyn LivingEntity) -> bool {
        match *self {
            RelationFilter::Any => true,
            RelationFilter::Relation(relation) => {
                origin.is_some_and(|origin| origin.relation_to(candidate) == relation)
            }
            RelationFilter::AggroAtMost(threshold) => {
                origin.is_some_and(|origin| origin.aggro_towards(candidate) <= threshold)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::TestObject;
    use worldpart_common::HitableObject;

    #[test]
    fn filters_from_origin_point_of_view() {
        let wolf = TestObject::creature(0, 0, 4, 4);
        let hunter = TestObject::creature(10, 0, 4, 4)
            .with_relation(wolf.id, Relation::Hostile)
            .with_aggro(wolf.id, -20);
        let wolf_living = wolf.as_living().unwrap();
        let hunter_living = hunter.as_living().unwrap();

        assert!(RelationFilter::Any.accepts(None, wolf_living));
        assert!(RelationFilter::Relation(Relation::Hostile).accepts(Some(hunter_living), wolf_living));
        assert!(!RelationFilter::Relation(Relation::Hostile).accepts(Some(wolf_living), hunter_living));
        assert!(RelationFilter::AggroAtMost(-10).accepts(Some(hunter_living), wolf_living));
        assert!(!RelationFilter::AggroAtMost(-10).accepts(Some(wolf_living), hunter_living));
        assert!(!RelationFilter::AggroAtMost(0).accepts(None, wolf_living));
    }
}
