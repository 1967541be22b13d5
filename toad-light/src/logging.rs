use toad_msg::alloc::Message;

pub(crate) fn msg_summary(msg: &Message) -> String {
  format!("{:?}: {:?} {} (id {}, {} opts) with {} byte payload",
          msg.code.kind(),
          msg.ty,
          msg.code.to_string(),
          msg.id.0,
          msg.opts.len(),
          msg.payload.0.len())
}
