use crate::structs::node::ConversationNode;

/// Plain-text rendering of a conversation for the clipboard.
/// System messages are left out.
pub fn transcript(node: &ConversationNode) -> String {
    node.visible_messages()
        .map(|m| format!("{}: {}", m.role.as_str().to_uppercase(), m.content))
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::NodeId;
    use crate::structs::message::Message;
    use crate::structs::node::Position;

    #[test]
    fn renders_roles_and_skips_system() {
        let node = ConversationNode {
            id: NodeId::from("n"),
            title: "untitled1".into(),
            model: "gemma-7b-it".into(),
            messages: vec![
                Message::system("secret", 1),
                Message::user("What is photosynthesis?", 2),
                Message::assistant("Photosynthesis is...", 3),
            ],
            parent_id: None,
            position: Position::default(),
            created_at: 0,
        };

        assert_eq!(
            transcript(&node),
            "USER: What is photosynthesis?\n\nASSISTANT: Photosynthesis is..."
        );
    }
}
